use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use catalog::model::Product;

// ---------------------------------------------------------------------------
// OrderStatus
// ---------------------------------------------------------------------------

/// Fulfilment state of an order.
///
/// ```text
/// processing → waiting_delivery → completed
///            → failed
///            → canceled
/// ```
///
/// Transitions are not guarded: admins and payment events may write any
/// status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Processing,
    WaitingDelivery,
    Completed,
    Failed,
    Canceled,
}

impl OrderStatus {
    /// Columns of the admin board, in display order.
    pub const BOARD: [OrderStatus; 4] = [
        OrderStatus::Processing,
        OrderStatus::WaitingDelivery,
        OrderStatus::Completed,
        OrderStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::WaitingDelivery => "waiting_delivery",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(Self::Processing),
            "waiting_delivery" => Some(Self::WaitingDelivery),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "canceled" => Some(Self::Canceled),
            _ => None,
        }
    }

    /// Human label for the admin board.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Processing => "Processing",
            Self::WaitingDelivery => "Waiting Delivery",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::Canceled => "Canceled",
        }
    }

    /// Status offered by the board's "advance" action.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Processing => Some(Self::WaitingDelivery),
            Self::WaitingDelivery => Some(Self::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Order
// ---------------------------------------------------------------------------

/// A product snapshot with the quantity bought and its price in the order
/// currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(flatten)]
    pub product: Product,
    pub quantity: u32,
    pub price_in_currency: f64,
}

impl OrderItem {
    pub fn line_total(&self) -> f64 {
        self.price_in_currency * f64::from(self.quantity)
    }
}

/// The subset of a gateway payment intent kept on the order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntentSnapshot {
    pub id: String,
    pub status: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub character_name: String,
    #[serde(default)]
    pub email: String,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    /// Lower-case ISO code.
    pub currency: String,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_intent: Option<PaymentIntentSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_session_id: Option<String>,
    pub user_id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Input for [`OrderService::create`](crate::service::OrderService::create).
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub character_name: String,
    pub email: String,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub currency: String,
    pub user_id: String,
}

/// A partial update. At least one field must be set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderUpdate {
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default, alias = "paymentStatus")]
    pub payment_status: Option<String>,
    #[serde(default, alias = "paymentIntent")]
    pub payment_intent: Option<PaymentIntentSnapshot>,
    #[serde(default, alias = "stripeSessionId")]
    pub stripe_session_id: Option<String>,
}

impl OrderUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.payment_status.is_none()
            && self.payment_intent.is_none()
            && self.stripe_session_id.is_none()
    }
}

// ---------------------------------------------------------------------------
// Change feed / board
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
        }
    }
}

/// Published on every order insert or update.
#[derive(Debug, Clone, Serialize)]
pub struct OrderChange {
    pub kind: ChangeKind,
    pub order: Order,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardColumn {
    pub status: OrderStatus,
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<OrderStatus>,
    pub orders: Vec<Order>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_names_roundtrip() {
        for s in [
            OrderStatus::Processing,
            OrderStatus::WaitingDelivery,
            OrderStatus::Completed,
            OrderStatus::Failed,
            OrderStatus::Canceled,
        ] {
            assert_eq!(OrderStatus::from_str(s.as_str()), Some(s));
            assert_eq!(serde_json::to_value(s).unwrap(), s.as_str());
        }
        assert_eq!(OrderStatus::from_str("shipped"), None);
    }

    #[test]
    fn next_walks_the_happy_path() {
        assert_eq!(OrderStatus::Processing.next(), Some(OrderStatus::WaitingDelivery));
        assert_eq!(OrderStatus::WaitingDelivery.next(), Some(OrderStatus::Completed));
        assert_eq!(OrderStatus::Completed.next(), None);
        assert_eq!(OrderStatus::Failed.next(), None);
    }

    #[test]
    fn empty_update_is_detected() {
        assert!(OrderUpdate::default().is_empty());
        let u: OrderUpdate = serde_json::from_value(serde_json::json!({"payment_status": "paid"})).unwrap();
        assert!(!u.is_empty());
    }
}
