use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum CmsError {
    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },

    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("decode: {0}")]
    Decode(String),
}

/// Query parameters, bound as `$name` in GROQ.
pub type QueryParams = BTreeMap<String, Value>;

/// Headless CMS query endpoint.
#[async_trait::async_trait]
pub trait CmsClient: Send + Sync + 'static {
    /// Run a GROQ query and return its `result`.
    async fn query(&self, groq: &str, params: &QueryParams) -> Result<Value, CmsError>;
}

/// Sanity HTTP query API client.
pub struct SanityClient {
    http: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl SanityClient {
    pub fn new(project_id: &str, dataset: &str, api_version: &str, token: Option<String>) -> Self {
        let base = format!("https://{}.api.sanity.io", project_id);
        Self::with_base_url(&base, dataset, api_version, token)
    }

    pub fn with_base_url(base_url: &str, dataset: &str, api_version: &str, token: Option<String>) -> Self {
        let version = api_version.trim_start_matches('v');
        Self {
            http: reqwest::Client::new(),
            url: format!(
                "{}/v{}/data/query/{}",
                base_url.trim_end_matches('/'),
                version,
                dataset
            ),
            token: token.filter(|t| !t.is_empty()),
        }
    }
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    result: Value,
}

/// Query-string pairs: the query itself plus each parameter JSON-encoded
/// under `$name`.
fn query_pairs(groq: &str, params: &QueryParams) -> Vec<(String, String)> {
    let mut pairs = vec![("query".to_string(), groq.to_string())];
    for (name, value) in params {
        pairs.push((format!("${}", name), value.to_string()));
    }
    pairs
}

#[async_trait::async_trait]
impl CmsClient for SanityClient {
    async fn query(&self, groq: &str, params: &QueryParams) -> Result<Value, CmsError> {
        let mut req = self.http.get(&self.url).query(&query_pairs(groq, params));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "cms query failed: {}", message);
            return Err(CmsError::Server {
                status: status.as_u16(),
                message,
            });
        }
        let body: QueryResponse = resp
            .json()
            .await
            .map_err(|e| CmsError::Decode(e.to_string()))?;
        Ok(body.result)
    }
}
