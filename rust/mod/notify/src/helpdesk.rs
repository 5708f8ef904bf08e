use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

/// Ticket status "Open".
pub const DEFAULT_STATUS: u8 = 2;
/// Ticket priority "Low".
pub const DEFAULT_PRIORITY: u8 = 1;

#[derive(Debug, thiserror::Error)]
pub enum TicketError {
    #[error("Missing required fields: email, subject, description.")]
    MissingFields,

    #[error("help desk is not configured")]
    NotConfigured,

    /// The help desk answered with an error; proxied to the caller.
    #[error("HTTP {status}: {details}")]
    Server {
        status: u16,
        details: Value,
        request_id: Option<String>,
    },

    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("decode: {0}")]
    Decode(String),
}

/// Support ticket as submitted by the contact form.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Option<u8>,
    #[serde(default)]
    pub priority: Option<u8>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Payload sent to the help desk, defaults applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTicket {
    pub email: String,
    pub subject: String,
    pub description: String,
    pub status: u8,
    pub priority: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl TicketRequest {
    pub fn validate(&self) -> Result<(), TicketError> {
        let blank = |s: &str| s.trim().is_empty();
        if blank(&self.email) || blank(&self.subject) || blank(&self.description) {
            return Err(TicketError::MissingFields);
        }
        Ok(())
    }
}

impl From<TicketRequest> for NewTicket {
    fn from(req: TicketRequest) -> Self {
        Self {
            email: req.email,
            subject: req.subject,
            description: req.description,
            status: req.status.filter(|s| *s != 0).unwrap_or(DEFAULT_STATUS),
            priority: req.priority.filter(|p| *p != 0).unwrap_or(DEFAULT_PRIORITY),
            name: req.name,
        }
    }
}

#[async_trait::async_trait]
pub trait HelpDesk: Send + Sync + 'static {
    /// Create a ticket and return the help desk's JSON answer.
    async fn create_ticket(&self, ticket: &NewTicket) -> Result<Value, TicketError>;
}

/// Freshdesk v2 API client.
pub struct Freshdesk {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl Freshdesk {
    /// `domain` is the account subdomain (`<domain>.freshdesk.com`).
    pub fn new(domain: &str, api_key: impl Into<String>) -> Self {
        Self::with_url(&format!("https://{}.freshdesk.com/api/v2/tickets", domain), api_key)
    }

    pub fn with_url(url: &str, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.to_string(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait::async_trait]
impl HelpDesk for Freshdesk {
    async fn create_ticket(&self, ticket: &NewTicket) -> Result<Value, TicketError> {
        let resp = self
            .http
            .post(&self.url)
            .basic_auth(&self.api_key, Some("X"))
            .json(ticket)
            .send()
            .await?;

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body: Value = resp
            .json()
            .await
            .map_err(|e| TicketError::Decode(e.to_string()))?;

        if !status.is_success() {
            error!(status = status.as_u16(), request_id = ?request_id, "help desk rejected ticket: {}", body);
            let details = body
                .get("errors")
                .or_else(|| body.get("description"))
                .cloned()
                .unwrap_or_else(|| Value::String("Unknown error".into()));
            return Err(TicketError::Server {
                status: status.as_u16(),
                details,
                request_id,
            });
        }
        info!(ticket = %body.get("id").unwrap_or(&serde_json::Value::Null), "help desk ticket created");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_and_zero() {
        let req: TicketRequest = serde_json::from_value(serde_json::json!({
            "email": "a@example.com",
            "subject": "Where is my order",
            "description": "…",
            "priority": 0,
        }))
        .unwrap();
        let ticket = NewTicket::from(req);
        assert_eq!(ticket.status, DEFAULT_STATUS);
        assert_eq!(ticket.priority, DEFAULT_PRIORITY);
        let v = serde_json::to_value(&ticket).unwrap();
        assert!(v.get("name").is_none());
    }

    #[test]
    fn required_fields() {
        let req: TicketRequest =
            serde_json::from_value(serde_json::json!({"email": "a@example.com", "subject": "x"})).unwrap();
        assert!(matches!(req.validate(), Err(TicketError::MissingFields)));
    }
}
