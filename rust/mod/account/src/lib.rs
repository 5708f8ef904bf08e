//! Account actions proxied to the managed auth service.

pub mod api;
pub mod provider;
pub mod service;

use std::sync::Arc;

use axum::Router;
use storefront_core::{Authenticator, Module};

use service::AccountService;

pub struct AccountModule {
    state: api::AppState,
}

impl AccountModule {
    pub fn new(svc: Arc<AccountService>, auth: Arc<dyn Authenticator>) -> Self {
        Self {
            state: api::AppState { svc, auth },
        }
    }
}

impl Module for AccountModule {
    fn name(&self) -> &str {
        "account"
    }

    fn routes(&self) -> Router {
        api::router(self.state.clone())
    }
}
