//! Outbound notifications: order emails, help-desk tickets and captcha
//! checks. Each collaborator sits behind a trait so tests can swap in fakes.

pub mod api;
pub mod captcha;
pub mod helpdesk;
pub mod mailer;
pub mod service;
pub mod template;

use std::sync::Arc;

use axum::Router;
use storefront_core::{Authenticator, Module};

use service::NotifyService;

pub struct NotifyModule {
    service: Arc<NotifyService>,
    auth: Arc<dyn Authenticator>,
}

impl NotifyModule {
    pub fn new(service: Arc<NotifyService>, auth: Arc<dyn Authenticator>) -> Self {
        Self { service, auth }
    }
}

impl Module for NotifyModule {
    fn name(&self) -> &str {
        "notify"
    }

    fn routes(&self) -> Router {
        api::router(api::AppState {
            svc: self.service.clone(),
            auth: self.auth.clone(),
        })
    }
}
