use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, header},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};

use storefront_core::auth::extract_bearer;
use storefront_core::{Authenticator, Claims, ServiceError, permission};

use crate::provider::Session;
use crate::service::{AccountService, SignedUp};

#[derive(Clone)]
pub struct AppState {
    pub svc: Arc<AccountService>,
    pub auth: Arc<dyn Authenticator>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/sign-up", post(sign_up))
        .route("/api/auth/sign-in", post(sign_in))
        .route("/api/auth/sign-out", post(sign_out))
        .route("/api/auth/forgot-password", post(forgot_password))
        .route("/api/auth/reset-password", post(reset_password))
        .route("/api/auth/oauth/{provider}", get(oauth))
        .route("/api/auth/me", get(me))
        .with_state(state)
}

fn origin(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::ORIGIN).and_then(|v| v.to_str().ok())
}

fn bearer(headers: &HeaderMap) -> Result<&str, ServiceError> {
    extract_bearer(headers).ok_or_else(|| ServiceError::Unauthorized("Unauthorized".into()))
}

#[derive(Deserialize)]
struct Credentials {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

async fn sign_up(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Credentials>,
) -> Result<Json<SignedUp>, ServiceError> {
    Ok(Json(state.svc.sign_up(&body.email, &body.password, origin(&headers)).await?))
}

async fn sign_in(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> Result<Json<Session>, ServiceError> {
    Ok(Json(state.svc.sign_in(&body.email, &body.password).await?))
}

async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Value>, ServiceError> {
    state.svc.sign_out(bearer(&headers)?).await?;
    Ok(Json(json!({ "message": "Signed out" })))
}

#[derive(Deserialize)]
struct ForgotBody {
    #[serde(default)]
    email: String,
}

async fn forgot_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ForgotBody>,
) -> Result<Json<Value>, ServiceError> {
    state.svc.forgot_password(&body.email, origin(&headers)).await?;
    Ok(Json(json!({ "message": "Check your email for a link to reset your password" })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResetBody {
    #[serde(default)]
    password: String,
    #[serde(default)]
    confirm_password: String,
}

async fn reset_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ResetBody>,
) -> Result<Json<Value>, ServiceError> {
    let token = bearer(&headers)?;
    state
        .svc
        .reset_password(token, &body.password, &body.confirm_password)
        .await?;
    Ok(Json(json!({
        "message": "Password updated successfully. Please sign in with your new password."
    })))
}

async fn oauth(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(provider): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let url = state.svc.oauth_url(&provider, origin(&headers))?;
    Ok(Json(json!({ "url": url })))
}

async fn me(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Claims>, ServiceError> {
    Ok(Json(state.auth.check(&headers, permission::CUSTOMER)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use storefront_core::{DenyAll, StaticUser};
    use tower::ServiceExt;

    use crate::service::fakes::FakeProvider;

    async fn call(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn post_json(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
        let mut req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(t) = token {
            req = req.header("authorization", format!("Bearer {t}"));
        }
        req.body(Body::from(serde_json::to_vec(&body).unwrap())).unwrap()
    }

    fn app(auth: Arc<dyn Authenticator>) -> (Router, Arc<FakeProvider>) {
        let fake = Arc::new(FakeProvider::default());
        let svc = AccountService::new(Some(fake.clone()), "https://shop.example");
        (router(AppState { svc: Arc::new(svc), auth }), fake)
    }

    #[tokio::test]
    async fn sign_in_and_failures() {
        let (app, _) = app(Arc::new(DenyAll));
        let (status, session) = call(
            &app,
            post_json("/api/auth/sign-in", json!({"email": "a@example.com", "password": "pw"}), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(session["access_token"], "at");

        let (status, body) = call(
            &app,
            post_json("/api/auth/sign-in", json!({"email": "a@example.com", "password": "bad_password"}), None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid login credentials");

        let (status, _) = call(&app, post_json("/api/auth/sign-up", json!({"email": "a@example.com"}), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn token_routes_need_bearer() {
        let (app, fake) = app(Arc::new(DenyAll));
        let (status, _) = call(&app, post_json("/api/auth/sign-out", json!({}), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(&app, post_json("/api/auth/sign-out", json!({}), Some("tok"))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(
            &app,
            post_json(
                "/api/auth/reset-password",
                json!({"password": "n3w", "confirmPassword": "n3w"}),
                Some("tok"),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(*fake.calls.lock().unwrap(), vec!["logout tok".to_string(), "update tok".to_string()]);
    }

    #[tokio::test]
    async fn oauth_and_me() {
        let (app, _) = app(Arc::new(StaticUser(Claims::customer("u1", "u1@example.com"))));
        let get = |uri: &str| Request::builder().uri(uri).body(Body::empty()).unwrap();

        let (status, body) = call(&app, get("/api/auth/oauth/discord")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["url"].as_str().unwrap().contains("provider=discord"));

        let (status, _) = call(&app, get("/api/auth/oauth/github")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, me) = call(&app, get("/api/auth/me")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["sub"], "u1");
        assert_eq!(me["email"], "u1@example.com");
    }
}
