mod checkout;
mod webhook;

pub use checkout::{CheckoutCreated, CheckoutInput, LineSummary, SessionSummary};
pub use webhook::{Event, WebhookAck, WebhookError};

use std::sync::Arc;

use catalog::service::CatalogService;
use notify::service::NotifyService;
use orders::service::OrderService;
use shop::currency::RateBook;
use storefront_core::ServiceError;

use crate::gateway::{GatewayError, PaymentGateway};
use crate::signature::DEFAULT_TOLERANCE_SECS;

/// Checkout and payment reconciliation.
pub struct PaymentService {
    orders: Arc<OrderService>,
    catalog: Arc<CatalogService>,
    rates: Arc<RateBook>,
    notify: Arc<NotifyService>,
    gateway: Option<Arc<dyn PaymentGateway>>,
    webhook_secret: Option<String>,
    tolerance_secs: i64,
    public_url: String,
}

impl PaymentService {
    pub fn new(
        orders: Arc<OrderService>,
        catalog: Arc<CatalogService>,
        rates: Arc<RateBook>,
        notify: Arc<NotifyService>,
    ) -> Self {
        Self {
            orders,
            catalog,
            rates,
            notify,
            gateway: None,
            webhook_secret: None,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
            public_url: String::new(),
        }
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        self.webhook_secret = (!secret.is_empty()).then_some(secret);
        self
    }

    /// Origin used for redirect URLs when the request carries none.
    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn gateway(&self) -> Result<&Arc<dyn PaymentGateway>, ServiceError> {
        self.gateway
            .as_ref()
            .ok_or_else(|| ServiceError::Internal("Payments are not configured".into()))
    }
}

fn gateway_error(e: GatewayError) -> ServiceError {
    match e {
        GatewayError::Server { status, message } => ServiceError::Upstream { status, message },
        other => ServiceError::Internal(other.to_string()),
    }
}
