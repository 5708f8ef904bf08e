//! Managed auth service client (GoTrue REST API).

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("decode: {0}")]
    Decode(String),

    #[error("invalid url: {0}")]
    Url(String),
}

/// OAuth identity providers offered on the login page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
    Discord,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Discord => "discord",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "google" => Some(Self::Google),
            "discord" => Some(Self::Discord),
            _ => None,
        }
    }
}

/// Tokens returned by a successful sign-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub user: Value,
}

#[async_trait::async_trait]
pub trait AuthProvider: Send + Sync + 'static {
    /// Register a user. The confirmation mail links to `redirect_to`.
    async fn sign_up(&self, email: &str, password: &str, redirect_to: &str) -> Result<Value, AuthServiceError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthServiceError>;

    /// Send a password recovery mail linking to `redirect_to`.
    async fn recover(&self, email: &str, redirect_to: &str) -> Result<(), AuthServiceError>;

    /// Set a new password for the session owning `access_token`.
    async fn update_password(&self, access_token: &str, password: &str) -> Result<(), AuthServiceError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthServiceError>;

    /// Where to send the browser to start an OAuth login.
    fn authorize_url(&self, provider: OAuthProvider, redirect_to: &str) -> Result<String, AuthServiceError>;
}

pub struct GoTrue {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl GoTrue {
    /// `url` is the project URL; the auth API lives under `/auth/v1`.
    pub fn new(url: &str, anon_key: impl Into<String>) -> Self {
        Self::with_base_url(&format!("{}/auth/v1", url.trim_end_matches('/')), anon_key)
    }

    pub fn with_base_url(base_url: &str, anon_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        }
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .post(format!("{}{}", self.base_url, path))
            .header("apikey", &self.anon_key)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, AuthServiceError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        let message = error_message(&body);
        error!(status = status.as_u16(), "auth service error: {}", message);
        Err(AuthServiceError::Server {
            status: status.as_u16(),
            message,
        })
    }
}

/// GoTrue reports errors under several keys depending on the endpoint.
fn error_message(body: &Value) -> String {
    ["msg", "error_description", "message", "error"]
        .iter()
        .find_map(|k| body.get(*k).and_then(Value::as_str))
        .unwrap_or("Unknown error")
        .to_string()
}

#[async_trait::async_trait]
impl AuthProvider for GoTrue {
    async fn sign_up(&self, email: &str, password: &str, redirect_to: &str) -> Result<Value, AuthServiceError> {
        let resp = self
            .post("/signup")
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| AuthServiceError::Decode(e.to_string()))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthServiceError> {
        let resp = self
            .post("/token")
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| AuthServiceError::Decode(e.to_string()))
    }

    async fn recover(&self, email: &str, redirect_to: &str) -> Result<(), AuthServiceError> {
        let resp = self
            .post("/recover")
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({ "email": email }))
            .send()
            .await?;
        Self::check(resp).await.map(|_| ())
    }

    async fn update_password(&self, access_token: &str, password: &str) -> Result<(), AuthServiceError> {
        let resp = self
            .http
            .put(format!("{}/user", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .json(&json!({ "password": password }))
            .send()
            .await?;
        Self::check(resp).await.map(|_| ())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthServiceError> {
        let resp = self.post("/logout").bearer_auth(access_token).send().await?;
        Self::check(resp).await.map(|_| ())
    }

    fn authorize_url(&self, provider: OAuthProvider, redirect_to: &str) -> Result<String, AuthServiceError> {
        reqwest::Url::parse_with_params(
            &format!("{}/authorize", self.base_url),
            &[("provider", provider.as_str()), ("redirect_to", redirect_to)],
        )
        .map(String::from)
        .map_err(|e| AuthServiceError::Url(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_is_encoded() {
        let gotrue = GoTrue::new("https://proj.supabase.co/", "anon");
        let url = gotrue
            .authorize_url(OAuthProvider::Discord, "https://shop.example/auth/callback?redirect_to=/")
            .unwrap();
        assert_eq!(
            url,
            "https://proj.supabase.co/auth/v1/authorize?provider=discord&redirect_to=https%3A%2F%2Fshop.example%2Fauth%2Fcallback%3Fredirect_to%3D%2F"
        );
    }

    #[test]
    fn error_message_keys() {
        assert_eq!(error_message(&json!({"msg": "User already registered"})), "User already registered");
        assert_eq!(
            error_message(&json!({"error": "invalid_grant", "error_description": "Invalid login credentials"})),
            "Invalid login credentials"
        );
        assert_eq!(error_message(&Value::Null), "Unknown error");
    }

    #[test]
    fn providers() {
        assert_eq!(OAuthProvider::parse("google"), Some(OAuthProvider::Google));
        assert_eq!(OAuthProvider::parse("github"), None);
    }
}
