use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use orders::model::{NewOrder, Order, OrderUpdate};
use orders::pricing::{LineRequest, price_lines};
use shop::currency::{Currency, price_to_cents};
use storefront_core::{Claims, ServiceError};

use super::{PaymentService, gateway_error};
use crate::gateway::{CheckoutRequest, Expandable, LineItem};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutInput {
    #[serde(default)]
    pub items: Vec<LineRequest>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, alias = "character_name")]
    pub character_name: String,
}

fn default_currency() -> String {
    "USD".into()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutCreated {
    pub id: String,
    pub url: Option<String>,
    pub order_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineSummary {
    pub description: String,
    pub quantity: u32,
    pub amount_total: i64,
    pub product_name: String,
}

/// What the success page shows after returning from the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub status: String,
    pub payment_status: String,
    pub customer_email: String,
    pub amount_total: i64,
    pub currency: String,
    pub created: i64,
    pub metadata: BTreeMap<String, String>,
    pub line_items: Vec<LineSummary>,
    pub order: Option<Order>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_details: Option<Value>,
}

impl PaymentService {
    /// Create the order, then a gateway checkout session for it.
    pub async fn create_checkout(
        &self,
        claims: &Claims,
        input: CheckoutInput,
        origin: Option<&str>,
    ) -> Result<CheckoutCreated, ServiceError> {
        if input.items.is_empty() {
            return Err(ServiceError::Validation("No items provided".into()));
        }
        if input.character_name.trim().is_empty() {
            return Err(ServiceError::Validation("Character name is required".into()));
        }
        let currency = Currency::from_code(&input.currency).ok_or_else(|| {
            ServiceError::Validation(format!("unsupported currency '{}'", input.currency))
        })?;
        let gateway = self.gateway()?;

        let (items, total_amount) =
            price_lines(&self.catalog, &self.rates.rates(), currency, &input.items)?;
        let character_name = input.character_name.trim().to_string();
        let order = self.orders.create(NewOrder {
            character_name: character_name.clone(),
            email: claims.email.clone().unwrap_or_default(),
            items,
            total_amount,
            currency: currency.as_str().to_string(),
            user_id: claims.sub.clone(),
        })?;

        let origin = origin
            .map(|o| o.trim_end_matches('/'))
            .filter(|o| !o.is_empty())
            .unwrap_or(&self.public_url);
        let request = CheckoutRequest {
            currency: order.currency.clone(),
            line_items: order
                .items
                .iter()
                .map(|item| LineItem {
                    name: item.product.name.clone(),
                    description: item.product.description.clone(),
                    unit_amount: price_to_cents(item.price_in_currency),
                    quantity: item.quantity,
                })
                .collect(),
            success_url: format!("{origin}/success?session_id={{CHECKOUT_SESSION_ID}}"),
            cancel_url: format!("{origin}/cart"),
            metadata: BTreeMap::from([
                ("orderId".to_string(), order.id.clone()),
                ("characterName".to_string(), character_name.clone()),
                ("userId".to_string(), claims.sub.clone()),
            ]),
            receipt_email: claims.email.clone().filter(|e| !e.is_empty()),
            description: format!("Order for {character_name}"),
        };

        let session = gateway.create_checkout_session(&request).await.map_err(|e| {
            error!(order = %order.id, "checkout session creation failed: {}", e);
            gateway_error(e)
        })?;
        self.orders.apply_update(
            &order.id,
            OrderUpdate {
                stripe_session_id: Some(session.id.clone()),
                ..Default::default()
            },
        )?;
        info!(
            order = %order.id,
            session = %session.id,
            currency = %order.currency,
            amount = order.total_amount,
            "checkout session created"
        );
        Ok(CheckoutCreated {
            id: session.id,
            url: session.url,
            order_id: order.id,
        })
    }

    /// Session details for the success page, joined with the local order.
    pub async fn verify_session(&self, session_id: &str) -> Result<SessionSummary, ServiceError> {
        if session_id.trim().is_empty() {
            return Err(ServiceError::Validation("Session ID is required".into()));
        }
        let session = self
            .gateway()?
            .retrieve_session(session_id)
            .await
            .map_err(gateway_error)?;

        let order = session
            .metadata
            .get("orderId")
            .and_then(|id| self.orders.get(id).ok());
        let intent_status = session
            .payment_intent
            .as_ref()
            .and_then(Expandable::as_object)
            .map(|pi| pi.status.clone());
        let status = session.status.clone().unwrap_or_else(|| "unknown".into());
        let line_items = session
            .line_items
            .map(|list| {
                list.data
                    .into_iter()
                    .map(|item| {
                        let description = item.description.unwrap_or_default();
                        LineSummary {
                            product_name: if description.is_empty() {
                                "Product".into()
                            } else {
                                description.clone()
                            },
                            description,
                            quantity: item.quantity.unwrap_or(0),
                            amount_total: item.amount_total.unwrap_or(0),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(SessionSummary {
            id: session.id,
            payment_status: intent_status.unwrap_or_else(|| status.clone()),
            status,
            customer_email: session.customer_email.unwrap_or_default(),
            amount_total: session.amount_total.unwrap_or(0),
            currency: session.currency.unwrap_or_else(|| "USD".into()),
            created: session.created,
            metadata: session.metadata,
            line_items,
            order,
            customer_details: session.customer_details,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::fakes::FakeGateway;
    use crate::service::testutil::harness;
    use orders::model::OrderStatus;

    fn input(product_id: &str, character: &str) -> CheckoutInput {
        serde_json::from_value(serde_json::json!({
            "items": [{"id": product_id, "quantity": 2}],
            "currency": "EUR",
            "characterName": character,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn checkout_creates_order_then_session() {
        let h = harness(FakeGateway::default());
        let claims = Claims::customer("u1", "u1@example.com");
        let created = h
            .svc
            .create_checkout(&claims, input(&h.product_id, "ExileOne"), Some("https://shop.example"))
            .await
            .unwrap();
        assert_eq!(created.id, "cs_1");

        let order = h.orders.get(&created.order_id).unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.currency, "eur");
        assert_eq!(order.email, "u1@example.com");
        assert_eq!(order.total_amount, 3.72);
        assert_eq!(order.stripe_session_id.as_deref(), Some("cs_1"));

        let requests = h.gateway.requests.lock().unwrap();
        let req = &requests[0];
        assert_eq!(req.line_items[0].unit_amount, 186);
        assert_eq!(req.line_items[0].quantity, 2);
        assert_eq!(req.success_url, "https://shop.example/success?session_id={CHECKOUT_SESSION_ID}");
        assert_eq!(req.cancel_url, "https://shop.example/cart");
        assert_eq!(req.metadata["orderId"], order.id);
        assert_eq!(req.metadata["characterName"], "ExileOne");
        assert_eq!(req.metadata["userId"], "u1");
        assert_eq!(req.description, "Order for ExileOne");
    }

    #[tokio::test]
    async fn checkout_validates_before_creating_anything() {
        let h = harness(FakeGateway::default());
        let claims = Claims::customer("u1", "u1@example.com");

        let err = h.svc.create_checkout(&claims, input(&h.product_id, "  "), None).await;
        assert!(matches!(err, Err(ServiceError::Validation(m)) if m == "Character name is required"));

        let empty: CheckoutInput =
            serde_json::from_value(serde_json::json!({"characterName": "x", "items": []})).unwrap();
        let err = h.svc.create_checkout(&claims, empty, None).await;
        assert!(matches!(err, Err(ServiceError::Validation(m)) if m == "No items provided"));

        assert!(h.gateway.requests.lock().unwrap().is_empty());
        assert!(h.orders.list_for_user("u1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn gateway_failure_is_proxied_and_falls_back_to_public_url() {
        let h = harness(FakeGateway { fail: true, ..Default::default() });
        let claims = Claims::customer("u1", "u1@example.com");
        let err = h.svc.create_checkout(&claims, input(&h.product_id, "ExileOne"), None).await;
        assert!(matches!(err, Err(ServiceError::Upstream { status: 402, .. })));

        let h = harness(FakeGateway::default());
        h.svc.create_checkout(&claims, input(&h.product_id, "ExileOne"), None).await.unwrap();
        assert_eq!(h.gateway.requests.lock().unwrap()[0].cancel_url, "https://shop.example/cart");
    }

    #[tokio::test]
    async fn verify_joins_order_and_prefers_intent_status() {
        let h = harness(FakeGateway::default());
        let claims = Claims::customer("u1", "u1@example.com");
        let created = h
            .svc
            .create_checkout(&claims, input(&h.product_id, "ExileOne"), None)
            .await
            .unwrap();

        let summary = h.svc.verify_session(&created.id).await.unwrap();
        assert_eq!(summary.status, "complete");
        assert_eq!(summary.payment_status, "succeeded");
        assert_eq!(summary.amount_total, 372);
        assert_eq!(summary.line_items[0].product_name, "Divine Orb");
        assert_eq!(summary.order.map(|o| o.id), Some(created.order_id));

        assert!(matches!(h.svc.verify_session("").await, Err(ServiceError::Validation(_))));
        assert!(matches!(
            h.svc.verify_session("cs_9").await,
            Err(ServiceError::Upstream { status: 404, .. })
        ));
    }
}
