use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;

use storefront_core::{Authenticator, ServiceError, permission};

use crate::service::{
    CheckoutCreated, CheckoutInput, PaymentService, SessionSummary, WebhookAck, WebhookError,
};

#[derive(Clone)]
pub struct AppState {
    pub svc: Arc<PaymentService>,
    pub auth: Arc<dyn Authenticator>,
}

/// Routes:
/// - `POST /api/create`            start checkout (customer)
/// - `GET  /api/checkout/verify`   session details for the success page
/// - `POST /api/webhooks/stripe`   gateway events (signed)
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/create", post(create_checkout))
        .route("/api/checkout/verify", get(verify_session))
        .route("/api/webhooks/stripe", post(webhook))
        .with_state(state)
}

async fn create_checkout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CheckoutInput>,
) -> Result<Json<CheckoutCreated>, ServiceError> {
    let claims = state.auth.check(&headers, permission::CUSTOMER)?;
    let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());
    Ok(Json(state.svc.create_checkout(&claims, body, origin).await?))
}

#[derive(Deserialize)]
struct VerifyQuery {
    #[serde(default)]
    session_id: String,
}

async fn verify_session(
    State(state): State<AppState>,
    Query(q): Query<VerifyQuery>,
) -> Result<Json<SessionSummary>, ServiceError> {
    Ok(Json(state.svc.verify_session(&q.session_id).await?))
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            WebhookError::NotConfigured => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": self.to_string() }),
            ),
            WebhookError::Handler(details) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Webhook handler failed", "details": details }),
            ),
            _ => (StatusCode::BAD_REQUEST, json!({ "error": self.to_string() })),
        };
        (status, Json(body)).into_response()
    }
}

async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, WebhookError> {
    let signature = headers.get("stripe-signature").and_then(|v| v.to_str().ok());
    Ok(Json(state.svc.handle_webhook(&body, signature).await?))
}
