//! Route registration: module routes plus system endpoints.

use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use storefront_core::Module;
use tracing::info;

/// Merge every module's routes with the system endpoints.
pub fn build_router(modules: &[Box<dyn Module>]) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/version", get(version));

    // Module paths are absolute, so merge rather than nest.
    for module in modules {
        app = app.merge(module.routes());
        info!("{} module mounted", module.name());
    }
    app
}

async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
    }))
}

async fn version() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": "storefrontd",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use catalog::CatalogModule;
    use catalog::service::CatalogService;
    use serde_json::Value;
    use storefront_core::DenyAll;
    use storefront_sql::SqliteStore;
    use tower::ServiceExt;

    use super::*;

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let resp = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_system_and_module_routes() {
        let catalog = Arc::new(CatalogService::new(Arc::new(SqliteStore::open_in_memory().unwrap())).unwrap());
        let modules: Vec<Box<dyn Module>> = vec![Box::new(CatalogModule::new(catalog, Arc::new(DenyAll)))];
        let app = build_router(&modules);

        let (status, body) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (_, body) = get_json(&app, "/version").await;
        assert_eq!(body["name"], "storefrontd");

        let (status, body) = get_json(&app, "/api/products").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_array());

        let (status, _) = get_json(&app, "/admin/catalog/products").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
