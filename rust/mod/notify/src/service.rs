use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info};

use orders::model::OrderStatus;
use orders::service::OrderService;
use storefront_core::ServiceError;

use crate::captcha::Captcha;
use crate::helpdesk::{HelpDesk, NewTicket, TicketError, TicketRequest};
use crate::mailer::{Email, Mailer};
use crate::template::{order_subject, render_order_confirmation};

/// Sender used when none is configured.
pub const DEFAULT_FROM: &str = "admin@pathoftrade.net";

/// Notification service. Collaborators that are not configured make the
/// matching operation fail with a server error.
pub struct NotifyService {
    orders: Arc<OrderService>,
    mailer: Option<Arc<dyn Mailer>>,
    from: String,
    helpdesk: Option<Arc<dyn HelpDesk>>,
    captcha: Option<Arc<dyn Captcha>>,
}

impl NotifyService {
    pub fn new(orders: Arc<OrderService>) -> Self {
        Self {
            orders,
            mailer: None,
            from: DEFAULT_FROM.to_string(),
            helpdesk: None,
            captcha: None,
        }
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>, from: Option<String>) -> Self {
        self.mailer = Some(mailer);
        if let Some(from) = from.filter(|f| !f.is_empty()) {
            self.from = from;
        }
        self
    }

    pub fn with_helpdesk(mut self, helpdesk: Arc<dyn HelpDesk>) -> Self {
        self.helpdesk = Some(helpdesk);
        self
    }

    pub fn with_captcha(mut self, captcha: Arc<dyn Captcha>) -> Self {
        self.captcha = Some(captcha);
        self
    }

    /// Email the confirmation for an order awaiting delivery.
    /// Returns the provider's message id.
    pub async fn send_order_email(&self, order_id: &str) -> Result<String, ServiceError> {
        if order_id.trim().is_empty() {
            return Err(ServiceError::Validation("Order ID is required".into()));
        }
        let order = self.orders.get(order_id).map_err(|e| match e {
            ServiceError::NotFound(_) => ServiceError::NotFound("Order not found".into()),
            other => other,
        })?;
        if order.status != OrderStatus::WaitingDelivery {
            return Err(ServiceError::Validation("Order is not ready for delivery".into()));
        }
        if order.email.is_empty() {
            return Err(ServiceError::Validation("Order has no email address".into()));
        }
        let mailer = self
            .mailer
            .as_ref()
            .ok_or_else(|| ServiceError::Internal("Email is not configured".into()))?;

        let email = Email {
            from: self.from.clone(),
            to: vec![order.email.clone()],
            subject: order_subject(&order),
            html: render_order_confirmation(&order),
        };
        match mailer.send(&email).await {
            Ok(id) => {
                info!(order = %order.id, message = %id, "order confirmation sent");
                Ok(id)
            }
            Err(e) => {
                error!(order = %order.id, "error sending email: {}", e);
                Err(ServiceError::Internal("Failed to send email".into()))
            }
        }
    }

    /// Open a help-desk ticket. Status and priority default to open / low.
    pub async fn create_ticket(&self, request: TicketRequest) -> Result<Value, TicketError> {
        request.validate()?;
        let helpdesk = self.helpdesk.as_ref().ok_or_else(|| {
            error!("help desk domain or API key is not configured");
            TicketError::NotConfigured
        })?;
        helpdesk.create_ticket(&NewTicket::from(request)).await
    }

    pub async fn validate_captcha(&self, token: &str) -> Result<(), ServiceError> {
        let captcha = self
            .captcha
            .as_ref()
            .ok_or_else(|| ServiceError::Internal("Failed to validate token".into()))?;
        match captcha.verify(token).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(ServiceError::Validation("Invalid token".into())),
            Err(e) => {
                error!("captcha validation failed: {}", e);
                Err(ServiceError::Internal("Failed to validate token".into()))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::sync::Mutex;

    use super::*;
    use crate::captcha::CaptchaError;
    use crate::mailer::MailError;

    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<Email>>,
        pub fail: bool,
    }

    #[async_trait::async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: &Email) -> Result<String, MailError> {
            if self.fail {
                return Err(MailError::Server { status: 422, message: "bad".into() });
            }
            let mut sent = self.sent.lock().unwrap();
            sent.push(email.clone());
            Ok(format!("msg-{}", sent.len()))
        }
    }

    pub struct FixedHelpDesk(pub Result<Value, (u16, Value)>);

    #[async_trait::async_trait]
    impl HelpDesk for FixedHelpDesk {
        async fn create_ticket(&self, ticket: &NewTicket) -> Result<Value, TicketError> {
            match &self.0 {
                Ok(v) => {
                    let mut v = v.clone();
                    v["subject"] = Value::String(ticket.subject.clone());
                    v["status"] = Value::from(ticket.status);
                    Ok(v)
                }
                Err((status, details)) => Err(TicketError::Server {
                    status: *status,
                    details: details.clone(),
                    request_id: Some("req-1".into()),
                }),
            }
        }
    }

    pub struct FixedCaptcha(pub Option<bool>);

    #[async_trait::async_trait]
    impl Captcha for FixedCaptcha {
        async fn verify(&self, _token: &str) -> Result<bool, CaptchaError> {
            self.0.ok_or_else(|| CaptchaError::Decode("unreachable".into()))
        }
    }
}
