pub mod schema;
pub mod difficulty;
pub mod league;
pub mod product;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use storefront_core::{ServiceError, merge_patch, now_rfc3339};
use storefront_sql::{Row, SQLError, SQLStore, Value};

/// Catalog service: products, leagues and difficulties over SQL.
pub struct CatalogService {
    pub(crate) sql: Arc<dyn SQLStore>,
}

impl CatalogService {
    pub fn new(sql: Arc<dyn SQLStore>) -> Result<Self, ServiceError> {
        schema::init_schema(sql.as_ref())?;
        Ok(Self { sql })
    }

    // ── Generic record helpers ──

    /// Insert a record as JSON into a table with indexed columns.
    pub(crate) fn insert_record<T: Serialize>(
        &self,
        table: &str,
        id: &str,
        record: &T,
        indexes: &[(&str, Value)],
    ) -> Result<(), ServiceError> {
        let json = serde_json::to_string(record)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        let mut cols = vec!["id", "data"];
        let mut placeholders = vec!["?1".to_string(), "?2".to_string()];
        let mut params = vec![Value::Text(id.to_string()), Value::Text(json)];

        for (i, (col, val)) in indexes.iter().enumerate() {
            cols.push(col);
            placeholders.push(format!("?{}", i + 3));
            params.push(val.clone());
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            cols.join(", "),
            placeholders.join(", "),
        );

        self.sql.exec(&sql, &params).map_err(|e| {
            if e.is_unique_violation() {
                ServiceError::Conflict(format!("{}/{} already exists", table, id))
            } else {
                storage(e)
            }
        })?;
        Ok(())
    }

    /// Get a record by id, deserializing the JSON `data` column.
    pub(crate) fn get_record<T: DeserializeOwned>(
        &self,
        table: &str,
        id: &str,
    ) -> Result<T, ServiceError> {
        let sql = format!("SELECT data FROM {} WHERE id = ?1", table);
        let rows = self.sql.query(&sql, &[id.into()]).map_err(storage)?;
        let row = rows
            .first()
            .ok_or_else(|| ServiceError::NotFound(format!("{}/{} not found", table, id)))?;
        decode_row(row)
    }

    /// Update a record's JSON data and indexed columns.
    pub(crate) fn update_record<T: Serialize>(
        &self,
        table: &str,
        id: &str,
        record: &T,
        indexes: &[(&str, Value)],
    ) -> Result<(), ServiceError> {
        let json = serde_json::to_string(record)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        let mut sets = vec!["data = ?1".to_string()];
        let mut params: Vec<Value> = vec![Value::Text(json)];
        for (i, (col, val)) in indexes.iter().enumerate() {
            sets.push(format!("{} = ?{}", col, i + 2));
            params.push(val.clone());
        }
        let id_idx = params.len() + 1;
        params.push(id.into());

        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            table,
            sets.join(", "),
            id_idx,
        );
        let affected = self.sql.exec(&sql, &params).map_err(storage)?;
        if affected == 0 {
            return Err(ServiceError::NotFound(format!("{}/{} not found", table, id)));
        }
        Ok(())
    }

    /// Delete a record by id.
    pub(crate) fn delete_record(&self, table: &str, id: &str) -> Result<(), ServiceError> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", table);
        let affected = self.sql.exec(&sql, &[id.into()]).map_err(storage)?;
        if affected == 0 {
            return Err(ServiceError::NotFound(format!("{}/{} not found", table, id)));
        }
        Ok(())
    }

    /// Run a `SELECT data ...` query and decode every row.
    pub(crate) fn query_records<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<T>, ServiceError> {
        let rows = self.sql.query(sql, params).map_err(storage)?;
        rows.iter().map(decode_row).collect()
    }

    /// Apply a JSON merge-patch to a record. `id` and `createdAt` are immutable.
    pub(crate) fn apply_patch<T: Serialize + DeserializeOwned>(
        current: &T,
        patch: serde_json::Value,
    ) -> Result<T, ServiceError> {
        let mut json = serde_json::to_value(current)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        let mut patch = patch;
        if let Some(obj) = patch.as_object_mut() {
            obj.remove("id");
            obj.remove("createdAt");
            obj.insert("updatedAt".into(), serde_json::json!(now_rfc3339()));
        }

        merge_patch(&mut json, &patch);
        serde_json::from_value(json).map_err(|e| ServiceError::Validation(e.to_string()))
    }
}

pub(crate) fn storage(e: SQLError) -> ServiceError {
    ServiceError::Storage(e.to_string())
}

fn decode_row<T: DeserializeOwned>(row: &Row) -> Result<T, ServiceError> {
    let data = row
        .get_str("data")
        .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
    serde_json::from_str(data).map_err(|e| ServiceError::Internal(e.to_string()))
}

/// Require a non-blank string field.
pub(crate) fn required(field: &str, value: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::Arc;

    use storefront_sql::SqliteStore;

    use super::CatalogService;

    pub fn service() -> CatalogService {
        let sql = SqliteStore::open_in_memory().unwrap();
        CatalogService::new(Arc::new(sql)).unwrap()
    }
}
