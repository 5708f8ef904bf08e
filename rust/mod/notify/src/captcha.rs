use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum CaptchaError {
    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("decode: {0}")]
    Decode(String),
}

/// Bot-protection token validation.
#[async_trait::async_trait]
pub trait Captcha: Send + Sync + 'static {
    /// Whether the token is valid.
    async fn verify(&self, token: &str) -> Result<bool, CaptchaError>;
}

/// Cloudflare Turnstile siteverify client.
pub struct Turnstile {
    http: reqwest::Client,
    url: String,
    secret_key: String,
}

impl Turnstile {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self::with_url(
            "https://challenges.cloudflare.com/turnstile/v0/siteverify",
            secret_key,
        )
    }

    pub fn with_url(url: &str, secret_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.to_string(),
            secret_key: secret_key.into(),
        }
    }
}

#[derive(Deserialize)]
struct SiteVerify {
    success: bool,
}

#[async_trait::async_trait]
impl Captcha for Turnstile {
    async fn verify(&self, token: &str) -> Result<bool, CaptchaError> {
        let resp = self
            .http
            .post(&self.url)
            .form(&[("secret", self.secret_key.as_str()), ("response", token)])
            .send()
            .await?;
        let body: SiteVerify = resp
            .json()
            .await
            .map_err(|e| CaptchaError::Decode(e.to_string()))?;
        Ok(body.success)
    }
}
