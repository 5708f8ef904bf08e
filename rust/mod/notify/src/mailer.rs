use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },

    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("decode: {0}")]
    Decode(String),
}

/// A rendered message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Email {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// Transactional email sender.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync + 'static {
    /// Send a message and return the provider's message id.
    async fn send(&self, email: &Email) -> Result<String, MailError>;
}

/// Resend HTTP API client.
pub struct ResendMailer {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ResendMailer {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url("https://api.resend.com", api_key)
    }

    pub fn with_base_url(base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Deserialize)]
struct SendResponse {
    id: String,
}

#[async_trait::async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &Email) -> Result<String, MailError> {
        let resp = self
            .http
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "email provider rejected message: {}", message);
            return Err(MailError::Server {
                status: status.as_u16(),
                message,
            });
        }
        let body: SendResponse = resp
            .json()
            .await
            .map_err(|e| MailError::Decode(e.to_string()))?;
        Ok(body.id)
    }
}
