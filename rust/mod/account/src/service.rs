use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use storefront_core::ServiceError;

use crate::provider::{AuthProvider, AuthServiceError, OAuthProvider, Session};

/// Where the recovery link lands after the auth service confirms it.
const RECOVERY_NEXT: &str = "/auth/callback?redirect_to=/reset-password";

pub struct AccountService {
    provider: Option<Arc<dyn AuthProvider>>,
    public_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignedUp {
    pub email: String,
    pub message: String,
    pub user: Value,
}

fn upstream(e: AuthServiceError) -> ServiceError {
    match e {
        AuthServiceError::Server { status, message } => ServiceError::Upstream { status, message },
        other => ServiceError::Internal(other.to_string()),
    }
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Minimal `application/x-www-form-urlencoded` component encoding.
fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

impl AccountService {
    pub fn new(provider: Option<Arc<dyn AuthProvider>>, public_url: impl Into<String>) -> Self {
        Self {
            provider,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn provider(&self) -> Result<&Arc<dyn AuthProvider>, ServiceError> {
        self.provider
            .as_ref()
            .ok_or_else(|| ServiceError::Internal("Auth service is not configured".into()))
    }

    fn origin<'a>(&'a self, origin: Option<&'a str>) -> &'a str {
        origin
            .map(|o| o.trim_end_matches('/'))
            .filter(|o| !o.is_empty())
            .unwrap_or(&self.public_url)
    }

    pub async fn sign_up(&self, email: &str, password: &str, origin: Option<&str>) -> Result<SignedUp, ServiceError> {
        if blank(email) || blank(password) {
            return Err(ServiceError::Validation("Email and password are required".into()));
        }
        let redirect = format!("{}/auth/callback", self.origin(origin));
        let user = self
            .provider()?
            .sign_up(email, password, &redirect)
            .await
            .map_err(upstream)?;
        info!(email, "sign-up requested");
        Ok(SignedUp {
            email: email.to_string(),
            message: "Check your email to confirm your account".into(),
            user,
        })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ServiceError> {
        if blank(email) || blank(password) {
            return Err(ServiceError::Validation("Email and password are required".into()));
        }
        self.provider()?.sign_in(email, password).await.map_err(upstream)
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<(), ServiceError> {
        self.provider()?.sign_out(access_token).await.map_err(upstream)
    }

    pub async fn forgot_password(&self, email: &str, origin: Option<&str>) -> Result<(), ServiceError> {
        if blank(email) {
            return Err(ServiceError::Validation("Email is required".into()));
        }
        let redirect = format!(
            "{}/auth/confirm?type=recovery&next={}",
            self.origin(origin),
            encode_component(RECOVERY_NEXT)
        );
        self.provider()?
            .recover(email, &redirect)
            .await
            .map_err(upstream)
    }

    pub async fn reset_password(
        &self,
        access_token: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<(), ServiceError> {
        if password.is_empty() || confirm_password.is_empty() {
            return Err(ServiceError::Validation(
                "Password and confirm password are required".into(),
            ));
        }
        if password != confirm_password {
            return Err(ServiceError::Validation("Passwords do not match".into()));
        }
        self.provider()?
            .update_password(access_token, password)
            .await
            .map_err(|e| match e {
                AuthServiceError::Server { status, .. } => ServiceError::Upstream {
                    status,
                    message: "Password update failed".into(),
                },
                other => upstream(other),
            })
    }

    pub fn oauth_url(&self, provider: &str, origin: Option<&str>) -> Result<String, ServiceError> {
        let provider = OAuthProvider::parse(provider)
            .ok_or_else(|| ServiceError::Validation(format!("unsupported provider '{}'", provider)))?;
        let redirect = format!("{}/auth/callback?redirect_to=/", self.origin(origin));
        self.provider()?
            .authorize_url(provider, &redirect)
            .map_err(upstream)
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::FakeProvider;
    use super::*;

    fn service() -> (AccountService, Arc<FakeProvider>) {
        let fake = Arc::new(FakeProvider::default());
        (AccountService::new(Some(fake.clone()), "https://shop.example/"), fake)
    }

    #[tokio::test]
    async fn sign_up_requires_both_fields_and_uses_origin() {
        let (svc, fake) = service();
        assert!(matches!(svc.sign_up("a@example.com", "", None).await, Err(ServiceError::Validation(_))));
        svc.sign_up("a@example.com", "secret", Some("https://preview.example")).await.unwrap();
        assert_eq!(
            fake.calls.lock().unwrap()[0],
            "signup a@example.com https://preview.example/auth/callback"
        );
    }

    #[tokio::test]
    async fn forgot_password_builds_recovery_redirect() {
        let (svc, fake) = service();
        assert!(matches!(svc.forgot_password(" ", None).await, Err(ServiceError::Validation(m)) if m == "Email is required"));
        svc.forgot_password("a@example.com", None).await.unwrap();
        assert_eq!(
            fake.calls.lock().unwrap()[0],
            "recover a@example.com https://shop.example/auth/confirm?type=recovery&next=%2Fauth%2Fcallback%3Fredirect_to%3D%2Freset-password"
        );
    }

    #[tokio::test]
    async fn reset_password_checks_confirmation() {
        let (svc, _) = service();
        assert!(matches!(
            svc.reset_password("at", "", "").await,
            Err(ServiceError::Validation(m)) if m == "Password and confirm password are required"
        ));
        assert!(matches!(
            svc.reset_password("at", "one", "two").await,
            Err(ServiceError::Validation(m)) if m == "Passwords do not match"
        ));
        assert!(matches!(
            svc.reset_password("expired", "one", "one").await,
            Err(ServiceError::Upstream { status: 401, message }) if message == "Password update failed"
        ));
        svc.reset_password("at", "one", "one").await.unwrap();
    }

    #[tokio::test]
    async fn oauth_providers_are_restricted() {
        let (svc, _) = service();
        let url = svc.oauth_url("google", None).unwrap();
        assert!(url.contains("provider=google"));
        assert!(url.ends_with("https://shop.example/auth/callback?redirect_to=/"));
        assert!(matches!(svc.oauth_url("github", None), Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn unconfigured_provider_is_internal() {
        let svc = AccountService::new(None, "");
        assert!(matches!(svc.sign_in("a@example.com", "x").await, Err(ServiceError::Internal(_))));
    }
}
