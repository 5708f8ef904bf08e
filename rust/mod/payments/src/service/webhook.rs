use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use orders::model::{OrderStatus, OrderUpdate};

use super::PaymentService;
use crate::gateway::{CheckoutSession, Expandable, PaymentIntent};
use crate::signature::{self, SignatureError};

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Empty request body")]
    EmptyBody,

    #[error("No signature")]
    MissingSignature,

    #[error("Server configuration error")]
    NotConfigured,

    #[error("Invalid signature")]
    InvalidSignature(#[source] SignatureError),

    /// The event was authentic but could not be applied.
    #[error("Webhook handler failed: {0}")]
    Handler(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub processed: bool,
}

fn status_for_event(kind: &str) -> Option<OrderStatus> {
    match kind {
        "payment_intent.succeeded" => Some(OrderStatus::WaitingDelivery),
        "payment_intent.payment_failed" => Some(OrderStatus::Failed),
        "payment_intent.canceled" => Some(OrderStatus::Canceled),
        _ => None,
    }
}

fn status_for_intent(status: &str) -> OrderStatus {
    match status {
        "succeeded" => OrderStatus::WaitingDelivery,
        "canceled" => OrderStatus::Canceled,
        _ => OrderStatus::Processing,
    }
}

fn handler<E: std::fmt::Display>(e: E) -> WebhookError {
    WebhookError::Handler(e.to_string())
}

impl PaymentService {
    /// Authenticate and apply a gateway event.
    pub async fn handle_webhook(
        &self,
        body: &[u8],
        signature_header: Option<&str>,
    ) -> Result<WebhookAck, WebhookError> {
        if body.is_empty() {
            return Err(WebhookError::EmptyBody);
        }
        let header = signature_header
            .filter(|h| !h.is_empty())
            .ok_or(WebhookError::MissingSignature)?;
        let secret = match (&self.webhook_secret, &self.gateway) {
            (Some(secret), Some(_)) => secret,
            _ => {
                error!("webhook secret or gateway key is not configured");
                return Err(WebhookError::NotConfigured);
            }
        };
        let now = chrono::Utc::now().timestamp();
        signature::verify(body, header, secret, now, self.tolerance_secs).map_err(|e| {
            warn!("webhook signature verification failed: {}", e);
            WebhookError::InvalidSignature(e)
        })?;

        let event: Event = serde_json::from_slice(body).map_err(handler)?;
        info!(event = %event.id, kind = %event.kind, "webhook event received");

        let processed = match event.kind.as_str() {
            "payment_intent.succeeded" | "payment_intent.payment_failed" | "payment_intent.canceled" => {
                self.apply_intent_event(&event).await?;
                true
            }
            "checkout.session.completed" => {
                self.apply_session_completed(&event).await?;
                true
            }
            other => {
                info!(kind = other, "unhandled webhook event type");
                false
            }
        };
        Ok(WebhookAck {
            received: true,
            processed,
        })
    }

    async fn apply_intent_event(&self, event: &Event) -> Result<(), WebhookError> {
        let intent: PaymentIntent = serde_json::from_value(event.data.object.clone()).map_err(handler)?;
        let order_id = intent.metadata.get("orderId").ok_or_else(|| {
            WebhookError::Handler(format!("No order ID in payment intent metadata: {}", intent.id))
        })?;
        if event.kind == "payment_intent.payment_failed" {
            warn!(
                intent = %intent.id,
                order = %order_id,
                error = ?intent.last_payment_error,
                "payment failed"
            );
        }

        let order = self
            .orders
            .apply_update(
                order_id,
                OrderUpdate {
                    status: status_for_event(&event.kind),
                    payment_status: Some(intent.status.clone()),
                    payment_intent: Some(intent.snapshot()),
                    stripe_session_id: None,
                },
            )
            .map_err(handler)?;
        info!(order = %order.id, intent = %intent.id, status = %order.status, "order reconciled from payment intent");
        Ok(())
    }

    async fn apply_session_completed(&self, event: &Event) -> Result<(), WebhookError> {
        let session: CheckoutSession = serde_json::from_value(event.data.object.clone()).map_err(handler)?;
        let order_id = session
            .metadata
            .get("orderId")
            .ok_or_else(|| WebhookError::Handler(format!("No order ID in session metadata: {}", session.id)))?;
        let intent = match &session.payment_intent {
            Some(Expandable::Object(intent)) => (**intent).clone(),
            Some(Expandable::Id(id)) => {
                let gateway = self.gateway.as_ref().ok_or(WebhookError::NotConfigured)?;
                gateway.retrieve_payment_intent(id).await.map_err(handler)?
            }
            None => {
                return Err(WebhookError::Handler(format!(
                    "No payment intent in session: {}",
                    session.id
                )));
            }
        };

        let status = status_for_intent(&intent.status);
        let order = self
            .orders
            .apply_update(
                order_id,
                OrderUpdate {
                    status: Some(status),
                    payment_status: Some(intent.status.clone()),
                    payment_intent: Some(intent.snapshot()),
                    stripe_session_id: Some(session.id.clone()),
                },
            )
            .map_err(handler)?;
        info!(order = %order.id, session = %session.id, status = %order.status, "order reconciled from checkout session");

        if status == OrderStatus::WaitingDelivery {
            // Email failures never fail the webhook.
            match self.notify.send_order_email(&order.id).await {
                Ok(id) => info!(order = %order.id, message = %id, "confirmation email sent"),
                Err(e) => error!(order = %order.id, "failed to send confirmation email: {}", e),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::service::fakes::{FakeGateway, intent};
    use crate::service::testutil::{WEBHOOK_SECRET, harness};
    use orders::model::NewOrder;
    use orders::service::OrderService;

    fn place_order(orders: &OrderService) -> String {
        let item: orders::model::OrderItem = serde_json::from_value(json!({
            "id": "p1", "name": "Divine Orb", "category": "currency", "description": "",
            "slug": "divine-orb", "price": 2.0, "imgUrl": "https://cdn.example/d.png",
            "gameVersion": "path-of-exile-1", "league": "Settlers", "difficulty": "softcore",
            "quantity": 2, "priceInCurrency": 1.86,
        }))
        .unwrap();
        orders
            .create(NewOrder {
                character_name: "ExileOne".into(),
                email: "u1@example.com".into(),
                items: vec![item],
                total_amount: 3.72,
                currency: "eur".into(),
                user_id: "u1".into(),
            })
            .unwrap()
            .id
    }

    fn signed(event: &Value) -> (Vec<u8>, String) {
        let body = serde_json::to_vec(event).unwrap();
        let header = signature::sign(&body, WEBHOOK_SECRET, chrono::Utc::now().timestamp());
        (body, header)
    }

    fn intent_event(kind: &str, status: &str, order_id: &str) -> Value {
        json!({
            "id": "evt_1",
            "type": kind,
            "data": {"object": serde_json::to_value(intent("pi_1", status, order_id)).unwrap()},
        })
    }

    #[tokio::test]
    async fn intent_events_drive_status() {
        let h = harness(FakeGateway::default());
        for (kind, status, expected) in [
            ("payment_intent.succeeded", "succeeded", OrderStatus::WaitingDelivery),
            ("payment_intent.payment_failed", "requires_payment_method", OrderStatus::Failed),
            ("payment_intent.canceled", "canceled", OrderStatus::Canceled),
        ] {
            let id = place_order(&h.orders);
            let (body, header) = signed(&intent_event(kind, status, &id));
            let ack = h.svc.handle_webhook(&body, Some(&header)).await.unwrap();
            assert_eq!(ack, WebhookAck { received: true, processed: true });

            let order = h.orders.get(&id).unwrap();
            assert_eq!(order.status, expected, "{kind}");
            assert_eq!(order.payment_status.as_deref(), Some(status));
            assert_eq!(order.payment_intent.map(|pi| pi.id).as_deref(), Some("pi_1"));
        }
        // Only session completion sends the email.
        assert!(h.mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn session_completed_retrieves_intent_and_emails() {
        let h = harness(FakeGateway::default());
        let id = place_order(&h.orders);
        h.gateway
            .intents
            .lock()
            .unwrap()
            .insert("pi_9".into(), intent("pi_9", "succeeded", &id));

        let (body, header) = signed(&json!({
            "id": "evt_2",
            "type": "checkout.session.completed",
            "data": {"object": {"id": "cs_7", "metadata": {"orderId": id}, "payment_intent": "pi_9"}},
        }));
        h.svc.handle_webhook(&body, Some(&header)).await.unwrap();

        let order = h.orders.get(&id).unwrap();
        assert_eq!(order.status, OrderStatus::WaitingDelivery);
        assert_eq!(order.stripe_session_id.as_deref(), Some("cs_7"));
        let sent = h.mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["u1@example.com".to_string()]);
    }

    #[tokio::test]
    async fn session_with_pending_intent_stays_processing() {
        let h = harness(FakeGateway::default());
        let id = place_order(&h.orders);
        let pending = serde_json::to_value(intent("pi_2", "processing", &id)).unwrap();
        let (body, header) = signed(&json!({
            "id": "evt_3",
            "type": "checkout.session.completed",
            "data": {"object": {"id": "cs_8", "metadata": {"orderId": id}, "payment_intent": pending}},
        }));
        h.svc.handle_webhook(&body, Some(&header)).await.unwrap();
        assert_eq!(h.orders.get(&id).unwrap().status, OrderStatus::Processing);
        assert!(h.mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn session_with_canceled_intent_cancels_the_order() {
        let h = harness(FakeGateway::default());
        let id = place_order(&h.orders);
        let canceled = serde_json::to_value(intent("pi_3", "canceled", &id)).unwrap();
        let (body, header) = signed(&json!({
            "id": "evt_6",
            "type": "checkout.session.completed",
            "data": {"object": {"id": "cs_9", "metadata": {"orderId": id}, "payment_intent": canceled}},
        }));
        h.svc.handle_webhook(&body, Some(&header)).await.unwrap();

        let order = h.orders.get(&id).unwrap();
        assert_eq!(order.status, OrderStatus::Canceled);
        assert_eq!(order.payment_status.as_deref(), Some("canceled"));
        assert!(h.mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_bad_requests() {
        let h = harness(FakeGateway::default());
        let id = place_order(&h.orders);
        let (body, header) = signed(&intent_event("payment_intent.succeeded", "succeeded", &id));

        assert!(matches!(h.svc.handle_webhook(b"", Some(&header)).await, Err(WebhookError::EmptyBody)));
        assert!(matches!(h.svc.handle_webhook(&body, None).await, Err(WebhookError::MissingSignature)));
        let forged = signature::sign(&body, "whsec_wrong", chrono::Utc::now().timestamp());
        assert!(matches!(
            h.svc.handle_webhook(&body, Some(&forged)).await,
            Err(WebhookError::InvalidSignature(SignatureError::NoMatch))
        ));
        assert_eq!(h.orders.get(&id).unwrap().status, OrderStatus::Processing);
    }

    #[tokio::test]
    async fn handler_failures_and_unhandled_types() {
        let h = harness(FakeGateway::default());
        let (body, header) = signed(&intent_event("payment_intent.succeeded", "succeeded", "missing"));
        assert!(matches!(h.svc.handle_webhook(&body, Some(&header)).await, Err(WebhookError::Handler(_))));

        let (body, header) = signed(&json!({
            "id": "evt_4",
            "type": "checkout.session.completed",
            "data": {"object": {"id": "cs_1", "metadata": {}}},
        }));
        assert!(matches!(h.svc.handle_webhook(&body, Some(&header)).await, Err(WebhookError::Handler(_))));

        let (body, header) = signed(&json!({"id": "evt_5", "type": "customer.created", "data": {"object": {}}}));
        let ack = h.svc.handle_webhook(&body, Some(&header)).await.unwrap();
        assert!(!ack.processed);
    }
}
