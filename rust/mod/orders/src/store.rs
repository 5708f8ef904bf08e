use std::sync::Arc;

use storefront_core::{ListParams, ListResult, ServiceError};
use storefront_sql::{Row, SQLStore, Value};

use crate::model::{Order, OrderStatus};

/// SQL schema for the orders table.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS orders (
    id                 TEXT PRIMARY KEY,
    data               TEXT NOT NULL,
    user_id            TEXT NOT NULL,
    status             TEXT NOT NULL,
    stripe_session_id  TEXT,
    create_at          TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_order_user ON orders(user_id);
CREATE INDEX IF NOT EXISTS idx_order_status ON orders(status);
CREATE INDEX IF NOT EXISTS idx_order_create_at ON orders(create_at);
";

/// Persistent storage for orders, backed by SQLStore (SQLite).
pub struct OrderStore {
    db: Arc<dyn SQLStore>,
}

impl OrderStore {
    /// Create a new OrderStore and initialise the schema.
    pub fn new(db: Arc<dyn SQLStore>) -> Result<Self, ServiceError> {
        db.exec_batch(SCHEMA)
            .map_err(|e| ServiceError::Storage(format!("order schema init: {e}")))?;
        Ok(Self { db })
    }

    pub fn insert(&self, order: &Order) -> Result<(), ServiceError> {
        let data =
            serde_json::to_string(order).map_err(|e| ServiceError::Internal(e.to_string()))?;

        self.db
            .exec(
                "INSERT INTO orders (id, data, user_id, status, stripe_session_id, create_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                &[
                    Value::Text(order.id.clone()),
                    Value::Text(data),
                    Value::Text(order.user_id.clone()),
                    order.status.as_str().into(),
                    Value::opt_text(order.stripe_session_id.as_deref()),
                    Value::Text(order.created_at.clone()),
                ],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Order, ServiceError> {
        let rows = self
            .db
            .query("SELECT data FROM orders WHERE id = ?1", &[id.into()])
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let row = rows
            .first()
            .ok_or_else(|| ServiceError::NotFound(format!("order {id} not found")))?;
        row_to_order(row)
    }

    /// Replace the data column and indexed columns.
    pub fn update(&self, order: &Order) -> Result<(), ServiceError> {
        let data =
            serde_json::to_string(order).map_err(|e| ServiceError::Internal(e.to_string()))?;

        let affected = self
            .db
            .exec(
                "UPDATE orders SET data = ?1, status = ?2, stripe_session_id = ?3 WHERE id = ?4",
                &[
                    Value::Text(data),
                    order.status.as_str().into(),
                    Value::opt_text(order.stripe_session_id.as_deref()),
                    Value::Text(order.id.clone()),
                ],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        if affected == 0 {
            return Err(ServiceError::NotFound(format!("order {} not found", order.id)));
        }
        Ok(())
    }

    /// A user's orders, newest first.
    pub fn list_for_user(&self, user_id: &str) -> Result<Vec<Order>, ServiceError> {
        self.select(
            "SELECT data FROM orders WHERE user_id = ?1 ORDER BY create_at DESC",
            &[user_id.into()],
        )
    }

    /// Every order, newest first, paginated.
    pub fn list(&self, params: &ListParams) -> Result<ListResult<Order>, ServiceError> {
        let rows = self
            .db
            .query("SELECT COUNT(*) as cnt FROM orders", &[])
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let total = rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0) as usize;

        let items = self.select(
            "SELECT data FROM orders ORDER BY create_at DESC LIMIT ?1 OFFSET ?2",
            &[
                Value::Integer(params.limit as i64),
                Value::Integer(params.offset as i64),
            ],
        )?;
        Ok(ListResult { items, total })
    }

    /// Orders in one status, newest first.
    pub fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, ServiceError> {
        self.select(
            "SELECT data FROM orders WHERE status = ?1 ORDER BY create_at DESC",
            &[status.as_str().into()],
        )
    }

    fn select(&self, sql: &str, params: &[Value]) -> Result<Vec<Order>, ServiceError> {
        let rows = self
            .db
            .query(sql, params)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        rows.iter().map(row_to_order).collect()
    }
}

fn row_to_order(row: &Row) -> Result<Order, ServiceError> {
    let data = row
        .get_str("data")
        .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
    serde_json::from_str(data).map_err(|e| ServiceError::Internal(e.to_string()))
}
