//! Payments: checkout sessions and webhook-driven order reconciliation.

pub mod api;
pub mod gateway;
pub mod service;
pub mod signature;

use std::sync::Arc;

use axum::Router;
use storefront_core::{Authenticator, Module};

use service::PaymentService;

pub struct PaymentsModule {
    state: api::AppState,
}

impl PaymentsModule {
    pub fn new(svc: Arc<PaymentService>, auth: Arc<dyn Authenticator>) -> Self {
        Self {
            state: api::AppState { svc, auth },
        }
    }
}

impl Module for PaymentsModule {
    fn name(&self) -> &str {
        "payments"
    }

    fn routes(&self) -> Router {
        api::router(self.state.clone())
    }
}
