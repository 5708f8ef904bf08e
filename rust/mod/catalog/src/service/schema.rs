use storefront_core::ServiceError;
use storefront_sql::{SQLStore, Value};

use crate::model::GameVersion;

/// Catalog tables. The full JSON document lives in `data`; filterable
/// fields are copied into indexed columns.
const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS products (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        name TEXT NOT NULL,
        category TEXT NOT NULL,
        game_version TEXT NOT NULL,
        league TEXT NOT NULL,
        difficulty TEXT NOT NULL,
        create_at TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_products_triple
        ON products(game_version, league, difficulty);
    CREATE INDEX IF NOT EXISTS idx_products_category ON products(category);

    CREATE TABLE IF NOT EXISTS leagues (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        name TEXT NOT NULL,
        game_version TEXT NOT NULL,
        is_active INTEGER NOT NULL,
        create_at TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_leagues_game ON leagues(game_version, is_active);

    CREATE TABLE IF NOT EXISTS difficulties (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        name TEXT NOT NULL,
        game_version TEXT NOT NULL,
        UNIQUE(game_version, name)
    );
";

/// Difficulty names present for every game version.
const DEFAULT_DIFFICULTIES: &[&str] = &["softcore", "hardcore"];

/// Create tables and seed the default difficulties. Idempotent.
pub fn init_schema(sql: &dyn SQLStore) -> Result<(), ServiceError> {
    sql.exec_batch(SCHEMA)
        .map_err(|e| ServiceError::Storage(format!("schema init: {}", e)))?;

    for gv in GameVersion::ALL {
        for name in DEFAULT_DIFFICULTIES {
            let id = format!("{}-{}", gv.short(), name);
            let data = serde_json::json!({
                "id": id,
                "name": name,
                "gameVersion": gv.as_str(),
            });
            sql.exec(
                "INSERT OR IGNORE INTO difficulties (id, data, name, game_version)
                 VALUES (?1, ?2, ?3, ?4)",
                &[
                    Value::Text(id.clone()),
                    Value::Text(data.to_string()),
                    (*name).into(),
                    gv.as_str().into(),
                ],
            )
            .map_err(|e| ServiceError::Storage(format!("seed difficulties: {}", e)))?;
        }
    }
    Ok(())
}
