pub mod api;
pub mod model;
pub mod service;
pub mod slug;

use std::sync::Arc;

use axum::Router;
use storefront_core::{Authenticator, Module};

use service::CatalogService;

/// Catalog module: products, leagues and difficulties.
pub struct CatalogModule {
    service: Arc<CatalogService>,
    auth: Arc<dyn Authenticator>,
}

impl CatalogModule {
    pub fn new(service: Arc<CatalogService>, auth: Arc<dyn Authenticator>) -> Self {
        Self { service, auth }
    }
}

impl Module for CatalogModule {
    fn name(&self) -> &str {
        "catalog"
    }

    fn routes(&self) -> Router {
        api::router(api::AppState {
            svc: self.service.clone(),
            auth: self.auth.clone(),
        })
    }
}
