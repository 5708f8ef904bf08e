//! Blog and editorial content served from the headless CMS, plus the
//! sitemap feed.

pub mod api;
pub mod cache;
pub mod client;
pub mod image;
pub mod model;
pub mod queries;
pub mod service;

use std::sync::Arc;

use axum::Router;
use storefront_core::{Authenticator, Module};

use service::ContentService;

pub struct ContentModule {
    state: api::AppState,
}

impl ContentModule {
    pub fn new(svc: Arc<ContentService>, auth: Arc<dyn Authenticator>) -> Self {
        Self {
            state: api::AppState { svc, auth },
        }
    }
}

impl Module for ContentModule {
    fn name(&self) -> &str {
        "content"
    }

    fn routes(&self) -> Router {
        api::router(self.state.clone())
    }
}
