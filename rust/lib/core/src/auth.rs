//! Session authentication.
//!
//! Sessions are issued by the managed auth service as HS256 JWTs. Modules
//! never decode tokens themselves: they call an [`Authenticator`] with the
//! request headers and the permission the endpoint needs. The concrete
//! implementation is injected at startup.

use axum::http::HeaderMap;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::ServiceError;

/// Permission strings checked by the storefront endpoints.
pub mod permission {
    /// Any signed-in customer.
    pub const CUSTOMER: &str = "shop:customer";
    /// Catalog, league and order administration.
    pub const ADMIN: &str = "shop:admin";
}

/// Role stored in `app_metadata.role` for administrators.
pub const ADMIN_ROLE: &str = "admin";

/// Claims carried by an auth-service session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Database role, normally `authenticated`.
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub app_metadata: AppMetadata,
    /// Expiration (unix timestamp).
    pub exp: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Claims {
    /// Claims for a plain customer. Used by tests and fixtures.
    pub fn customer(sub: &str, email: &str) -> Self {
        Self {
            sub: sub.to_string(),
            email: Some(email.to_string()),
            role: "authenticated".to_string(),
            app_metadata: AppMetadata::default(),
            exp: i64::MAX,
        }
    }

    /// Claims for an administrator.
    pub fn admin(sub: &str, email: &str) -> Self {
        let mut claims = Self::customer(sub, email);
        claims.app_metadata.role = Some(ADMIN_ROLE.to_string());
        claims
    }

    pub fn is_admin(&self) -> bool {
        self.app_metadata.role.as_deref() == Some(ADMIN_ROLE)
    }

    /// Whether these claims satisfy `permission`.
    pub fn allows(&self, permission: &str) -> bool {
        match permission {
            permission::ADMIN => self.is_admin(),
            _ => true,
        }
    }
}

/// Pluggable authenticator. Endpoints call this with the request headers
/// and the permission they require.
pub trait Authenticator: Send + Sync + 'static {
    /// Authenticate a request and check the given permission.
    ///
    /// Returns the session claims if allowed. A missing or invalid session
    /// is `Unauthorized`; a valid session lacking the permission is
    /// `PermissionDenied`.
    fn check(&self, headers: &HeaderMap, permission: &str) -> Result<Claims, ServiceError>;
}

/// Validates auth-service JWTs with the shared HS256 secret.
pub struct JwtAuthenticator {
    decoding_key: DecodingKey,
    validation: Validation,
    admin_emails: Vec<String>,
}

impl JwtAuthenticator {
    pub fn new(secret: &str, admin_emails: Vec<String>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&["authenticated"]);
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            admin_emails: admin_emails
                .into_iter()
                .map(|e| e.to_lowercase())
                .collect(),
        }
    }

    /// Decode and validate a raw token.
    pub fn decode(&self, token: &str) -> Result<Claims, ServiceError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| ServiceError::Unauthorized(format!("invalid token: {}", e)))?;
        let mut claims = data.claims;

        // Operators listed in the config are admins even without the role claim.
        let listed = claims
            .email
            .as_deref()
            .map(|e| self.admin_emails.iter().any(|a| a == &e.to_lowercase()))
            .unwrap_or(false);
        if listed {
            claims.app_metadata.role = Some(ADMIN_ROLE.to_string());
        }
        Ok(claims)
    }
}

impl Authenticator for JwtAuthenticator {
    fn check(&self, headers: &HeaderMap, permission: &str) -> Result<Claims, ServiceError> {
        let token = extract_bearer(headers)
            .ok_or_else(|| ServiceError::Unauthorized("Unauthorized".into()))?;
        let claims = self.decode(token)?;
        if !claims.allows(permission) {
            return Err(ServiceError::PermissionDenied(format!(
                "user {} lacks permission {}",
                claims.sub, permission
            )));
        }
        Ok(claims)
    }
}

/// Accepts every request as an administrator. Used for tests.
pub struct AllowAll;

impl Authenticator for AllowAll {
    fn check(&self, _headers: &HeaderMap, _permission: &str) -> Result<Claims, ServiceError> {
        Ok(Claims::admin("admin", "admin@example.com"))
    }
}

/// Rejects every request as unauthenticated. Used for tests.
pub struct DenyAll;

impl Authenticator for DenyAll {
    fn check(&self, _headers: &HeaderMap, _permission: &str) -> Result<Claims, ServiceError> {
        Err(ServiceError::Unauthorized("Unauthorized".into()))
    }
}

/// Treats every request as coming from one fixed session.
pub struct StaticUser(pub Claims);

impl Authenticator for StaticUser {
    fn check(&self, _headers: &HeaderMap, permission: &str) -> Result<Claims, ServiceError> {
        if !self.0.allows(permission) {
            return Err(ServiceError::PermissionDenied(format!(
                "user {} lacks permission {}",
                self.0.sub, permission
            )));
        }
        Ok(self.0.clone())
    }
}

/// Extract the Bearer token from the Authorization header.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}
