use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tracing::{info, warn};

use storefront_core::{ListParams, ListResult, ServiceError, new_id, now_rfc3339};
use storefront_sql::SQLStore;

use crate::model::{
    BoardColumn, ChangeKind, NewOrder, Order, OrderChange, OrderStatus, OrderUpdate,
};
use crate::store::OrderStore;

/// Buffered change events per subscriber before it starts lagging.
const FEED_CAPACITY: usize = 256;

/// Order lifecycle: persistence plus the realtime change feed.
pub struct OrderService {
    store: OrderStore,
    feed: broadcast::Sender<OrderChange>,
    // Serializes read-modify-write cycles on the stored document.
    write_lock: Mutex<()>,
}

impl OrderService {
    pub fn new(db: Arc<dyn SQLStore>) -> Result<Self, ServiceError> {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Ok(Self {
            store: OrderStore::new(db)?,
            feed,
            write_lock: Mutex::new(()),
        })
    }

    /// Subscribe to order inserts and updates.
    pub fn subscribe(&self) -> broadcast::Receiver<OrderChange> {
        self.feed.subscribe()
    }

    fn publish(&self, kind: ChangeKind, order: &Order) {
        // No subscribers is fine.
        let _ = self.feed.send(OrderChange {
            kind,
            order: order.clone(),
        });
    }

    /// Insert a new order in `processing`.
    pub fn create(&self, input: NewOrder) -> Result<Order, ServiceError> {
        if input.character_name.trim().is_empty() {
            return Err(ServiceError::Validation("Character name is required".into()));
        }
        if input.items.is_empty() {
            return Err(ServiceError::Validation("No items provided".into()));
        }
        let now = now_rfc3339();
        let order = Order {
            id: new_id(),
            character_name: input.character_name.trim().to_string(),
            email: input.email,
            items: input.items,
            total_amount: input.total_amount,
            currency: input.currency.to_lowercase(),
            status: OrderStatus::Processing,
            payment_status: None,
            payment_intent: None,
            stripe_session_id: None,
            user_id: input.user_id,
            created_at: now.clone(),
            updated_at: now,
        };
        self.store.insert(&order)?;
        info!(order = %order.id, user = %order.user_id, total = order.total_amount, currency = %order.currency, "order created");
        self.publish(ChangeKind::Insert, &order);
        Ok(order)
    }

    pub fn get(&self, id: &str) -> Result<Order, ServiceError> {
        self.store.get(id)
    }

    pub fn list_for_user(&self, user_id: &str) -> Result<Vec<Order>, ServiceError> {
        self.store.list_for_user(user_id)
    }

    pub fn list_all(&self, params: &ListParams) -> Result<ListResult<Order>, ServiceError> {
        self.store.list(params)
    }

    /// Orders grouped into the admin board columns.
    pub fn board(&self) -> Result<Vec<BoardColumn>, ServiceError> {
        OrderStatus::BOARD
            .into_iter()
            .map(|status| {
                Ok(BoardColumn {
                    status,
                    label: status.label(),
                    next: status.next(),
                    orders: self.store.list_by_status(status)?,
                })
            })
            .collect()
    }

    /// Load, change and store one order under the write lock.
    fn modify<F>(&self, id: &str, f: F) -> Result<Order, ServiceError>
    where
        F: FnOnce(&mut Order) -> Result<(), ServiceError>,
    {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut order = self.store.get(id)?;
        let previous = order.status;
        f(&mut order)?;
        order.updated_at = now_rfc3339();
        self.store.update(&order)?;
        if previous != order.status {
            info!(order = %order.id, from = %previous, to = %order.status, "order status changed");
        }
        self.publish(ChangeKind::Update, &order);
        Ok(order)
    }

    /// Apply a partial update. Any status may be written.
    pub fn apply_update(&self, id: &str, update: OrderUpdate) -> Result<Order, ServiceError> {
        if update.is_empty() {
            return Err(ServiceError::Validation("No fields to update".into()));
        }
        self.modify(id, |order| {
            if let Some(status) = update.status {
                order.status = status;
            }
            if let Some(payment_status) = update.payment_status {
                order.payment_status = Some(payment_status);
            }
            if let Some(intent) = update.payment_intent {
                order.payment_intent = Some(intent);
            }
            if let Some(session_id) = update.stripe_session_id {
                order.stripe_session_id = Some(session_id);
            }
            Ok(())
        })
    }

    pub fn set_status(&self, id: &str, status: OrderStatus) -> Result<Order, ServiceError> {
        self.apply_update(
            id,
            OrderUpdate {
                status: Some(status),
                ..Default::default()
            },
        )
    }

    /// Move an order to the next board column.
    pub fn advance(&self, id: &str) -> Result<Order, ServiceError> {
        self.modify(id, |order| {
            let next = order.status.next().ok_or_else(|| {
                warn!(order = id, status = %order.status, "advance requested on final column");
                ServiceError::Validation(format!("order {} cannot advance from {}", id, order.status))
            })?;
            order.status = next;
            Ok(())
        })
    }
}
