//! Payment gateway client (Stripe REST API).
//!
//! Requests are form-encoded with Stripe's bracket notation; responses are
//! decoded into the few fields the storefront reads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

use orders::model::PaymentIntentSnapshot;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },

    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("decode: {0}")]
    Decode(String),
}

/// A field that is either an object id or, when expanded, the object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expandable<T> {
    Id(String),
    Object(Box<T>),
}

impl<T> Expandable<T> {
    pub fn as_object(&self) -> Option<&T> {
        match self {
            Expandable::Object(obj) => Some(obj),
            Expandable::Id(_) => None,
        }
    }
}

/// Id of a field that may be a bare id or an expanded object.
fn object_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub customer: Option<Value>,
    #[serde(default)]
    pub payment_method: Option<Value>,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub receipt_email: Option<String>,
    #[serde(default)]
    pub last_payment_error: Option<Value>,
}

impl PaymentIntent {
    /// The fields stored on the order.
    pub fn snapshot(&self) -> PaymentIntentSnapshot {
        PaymentIntentSnapshot {
            id: self.id.clone(),
            status: self.status.clone(),
            amount: self.amount,
            currency: self.currency.clone(),
            customer: self.customer.as_ref().and_then(object_id),
            payment_method: self.payment_method.as_ref().and_then(object_id),
            created: self.created,
            metadata: self.metadata.clone(),
            receipt_email: self.receipt_email.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLineItem {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub amount_total: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemList {
    #[serde(default)]
    pub data: Vec<SessionLineItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_details: Option<Value>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub payment_intent: Option<Expandable<PaymentIntent>>,
    #[serde(default)]
    pub line_items: Option<LineItemList>,
}

/// One line of a checkout session.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub name: String,
    pub description: String,
    /// Minor units of the session currency.
    pub unit_amount: i64,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    /// Lower-case ISO code.
    pub currency: String,
    pub line_items: Vec<LineItem>,
    pub success_url: String,
    pub cancel_url: String,
    /// Copied onto both the session and its payment intent.
    pub metadata: BTreeMap<String, String>,
    pub receipt_email: Option<String>,
    pub description: String,
}

impl CheckoutRequest {
    /// Form fields in bracket notation.
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
            ("payment_intent_data[description]".to_string(), self.description.clone()),
        ];
        for (i, item) in self.line_items.iter().enumerate() {
            let prefix = format!("line_items[{i}]");
            form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
            form.push((format!("{prefix}[price_data][currency]"), self.currency.clone()));
            form.push((format!("{prefix}[price_data][unit_amount]"), item.unit_amount.to_string()));
            form.push((format!("{prefix}[price_data][product_data][name]"), item.name.clone()));
            if !item.description.is_empty() {
                form.push((
                    format!("{prefix}[price_data][product_data][description]"),
                    item.description.clone(),
                ));
            }
        }
        for (key, value) in &self.metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
            form.push((format!("payment_intent_data[metadata][{key}]"), value.clone()));
        }
        if let Some(email) = &self.receipt_email {
            form.push(("payment_intent_data[receipt_email]".to_string(), email.clone()));
        }
        form
    }
}

#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    async fn create_checkout_session(&self, req: &CheckoutRequest) -> Result<CheckoutSession, GatewayError>;

    /// Retrieve a session with its customer, payment intent and line items
    /// expanded.
    async fn retrieve_session(&self, id: &str) -> Result<CheckoutSession, GatewayError>;

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError>;
}

pub struct StripeGateway {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self::with_base_url("https://api.stripe.com", secret_key)
    }

    pub fn with_base_url(base_url: &str, secret_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, GatewayError> {
        let status = resp.status();
        if !status.is_success() {
            let body: Value = resp.json().await.unwrap_or(Value::Null);
            let message = body["error"]["message"]
                .as_str()
                .unwrap_or("unknown gateway error")
                .to_string();
            error!(status = status.as_u16(), "payment gateway error: {}", message);
            return Err(GatewayError::Server {
                status: status.as_u16(),
                message,
            });
        }
        resp.json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(&self, req: &CheckoutRequest) -> Result<CheckoutSession, GatewayError> {
        let resp = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&req.to_form())
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn retrieve_session(&self, id: &str) -> Result<CheckoutSession, GatewayError> {
        let resp = self
            .http
            .get(format!("{}/v1/checkout/sessions/{}", self.base_url, id))
            .bearer_auth(&self.secret_key)
            .query(&[
                ("expand[]", "customer"),
                ("expand[]", "payment_intent"),
                ("expand[]", "line_items.data.price.product"),
            ])
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError> {
        let resp = self
            .http
            .get(format!("{}/v1/payment_intents/{}", self.base_url, id))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        Self::decode(resp).await
    }
}
