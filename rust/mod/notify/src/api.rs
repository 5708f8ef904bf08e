use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;
use serde_json::{Value, json};

use storefront_core::{Authenticator, ServiceError, permission};

use crate::helpdesk::{TicketError, TicketRequest};
use crate::service::NotifyService;

#[derive(Clone)]
pub struct AppState {
    pub svc: Arc<NotifyService>,
    pub auth: Arc<dyn Authenticator>,
}

/// Routes:
/// - `POST /api/send-email`               order confirmation (admin)
/// - `POST /api/create-ticket`            contact form
/// - `POST /api/auth/validate-turnstile`  captcha check
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/send-email", post(send_email))
        .route("/api/create-ticket", post(create_ticket))
        .route("/api/auth/validate-turnstile", post(validate_turnstile))
        .with_state(state)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailBody {
    #[serde(default)]
    order_id: String,
}

async fn send_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SendEmailBody>,
) -> Result<Json<Value>, ServiceError> {
    state.auth.check(&headers, permission::ADMIN)?;
    let id = state.svc.send_order_email(&body.order_id).await?;
    Ok(Json(json!({ "message": "Email sent successfully", "id": id })))
}

impl IntoResponse for TicketError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            TicketError::MissingFields => (
                StatusCode::BAD_REQUEST,
                json!({ "message": "Missing required fields: email, subject, description." }),
            ),
            TicketError::NotConfigured => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "message": "Server configuration error." }),
            ),
            TicketError::Server { status, details, request_id } => (
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                json!({
                    "message": "Error creating ticket in Freshdesk.",
                    "details": details,
                    "requestId": request_id,
                }),
            ),
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "message": "Internal Server Error", "details": other.to_string() }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

async fn create_ticket(
    State(state): State<AppState>,
    Json(body): Json<TicketRequest>,
) -> Result<(StatusCode, Json<Value>), TicketError> {
    let ticket = state.svc.create_ticket(body).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

#[derive(Deserialize)]
struct TurnstileBody {
    #[serde(default)]
    token: String,
}

async fn validate_turnstile(
    State(state): State<AppState>,
    Json(body): Json<TurnstileBody>,
) -> Result<Json<Value>, ServiceError> {
    state.svc.validate_captcha(&body.token).await?;
    Ok(Json(json!({ "message": "Token is valid" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use orders::model::OrderStatus;
    use orders::service::OrderService;
    use storefront_core::{AllowAll, Claims, StaticUser};
    use storefront_sql::SqliteStore;
    use tower::ServiceExt;

    use crate::service::fakes::*;

    async fn api(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&v).unwrap())
            }
            None => Body::empty(),
        };
        let resp = router.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn orders() -> Arc<OrderService> {
        Arc::new(OrderService::new(Arc::new(SqliteStore::open_in_memory().unwrap())).unwrap())
    }

    fn app(svc: NotifyService, auth: Arc<dyn Authenticator>) -> Router {
        router(AppState { svc: Arc::new(svc), auth })
    }

    #[tokio::test]
    async fn send_email_requires_admin_and_ready_order() {
        let orders = orders();
        let sample = crate::template::tests::order();
        let order = orders
            .create(orders::model::NewOrder {
                character_name: sample.character_name,
                email: sample.email,
                items: sample.items,
                total_amount: sample.total_amount,
                currency: sample.currency,
                user_id: sample.user_id,
            })
            .unwrap();
        let mailer = Arc::new(RecordingMailer::default());
        let svc = || NotifyService::new(orders.clone()).with_mailer(mailer.clone(), None);
        let body = json!({ "orderId": order.id });

        let customer = app(svc(), Arc::new(StaticUser(Claims::customer("u1", "u1@example.com"))));
        let (status, _) = api(&customer, "POST", "/api/send-email", Some(body.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let admin = app(svc(), Arc::new(AllowAll));
        let (status, resp) = api(&admin, "POST", "/api/send-email", Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["message"], "Order is not ready for delivery");

        orders.set_status(&order.id, OrderStatus::WaitingDelivery).unwrap();
        let (status, resp) = api(&admin, "POST", "/api/send-email", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["id"], "msg-1");
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);

        let (status, _) = api(&admin, "POST", "/api/send-email", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn ticket_creation_and_proxied_errors() {
        let ok = app(
            NotifyService::new(orders()).with_helpdesk(Arc::new(FixedHelpDesk(Ok(json!({"id": 7}))))),
            Arc::new(AllowAll),
        );
        let ticket = json!({"email": "a@example.com", "subject": "Help", "description": "Late"});
        let (status, body) = api(&ok, "POST", "/api/create-ticket", Some(ticket.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], 7);
        assert_eq!(body["status"], 2);

        let (status, body) = api(&ok, "POST", "/api/create-ticket", Some(json!({"email": "a@example.com"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Missing required fields: email, subject, description.");

        let rejecting = app(
            NotifyService::new(orders())
                .with_helpdesk(Arc::new(FixedHelpDesk(Err((422, json!([{"field": "email"}])))))),
            Arc::new(AllowAll),
        );
        let (status, body) = api(&rejecting, "POST", "/api/create-ticket", Some(ticket.clone())).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["details"][0]["field"], "email");
        assert_eq!(body["requestId"], "req-1");

        let unconfigured = app(NotifyService::new(orders()), Arc::new(AllowAll));
        let (status, body) = api(&unconfigured, "POST", "/api/create-ticket", Some(ticket)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Server configuration error.");
    }

    #[tokio::test]
    async fn turnstile_validation() {
        let valid = app(
            NotifyService::new(orders()).with_captcha(Arc::new(FixedCaptcha(Some(true)))),
            Arc::new(AllowAll),
        );
        let (status, _) = api(&valid, "POST", "/api/auth/validate-turnstile", Some(json!({"token": "t"}))).await;
        assert_eq!(status, StatusCode::OK);

        let invalid = app(
            NotifyService::new(orders()).with_captcha(Arc::new(FixedCaptcha(Some(false)))),
            Arc::new(AllowAll),
        );
        let (status, body) = api(&invalid, "POST", "/api/auth/validate-turnstile", Some(json!({"token": "t"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid token");
    }
}
