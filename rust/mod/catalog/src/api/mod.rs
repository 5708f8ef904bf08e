mod admin;
mod public;

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderMap;

use storefront_core::{Authenticator, ServiceError, permission};

use crate::model::GameVersion;
use crate::service::CatalogService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub svc: Arc<CatalogService>,
    pub auth: Arc<dyn Authenticator>,
}

impl AppState {
    fn require_admin(&self, headers: &HeaderMap) -> Result<(), ServiceError> {
        self.auth.check(headers, permission::ADMIN).map(|_| ())
    }
}

/// Build the catalog router: public browsing under `/api`, management
/// under `/admin/catalog`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(public::routes())
        .merge(admin::routes())
        .with_state(state)
}

fn parse_game(s: &str) -> Result<GameVersion, ServiceError> {
    GameVersion::from_str(s)
        .ok_or_else(|| ServiceError::Validation(format!("invalid gameVersion '{}'", s)))
}
