use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Currency, Rates};

/// Rate source error.
#[derive(Debug, thiserror::Error)]
pub enum RateSourceError {
    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },

    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("decode: {0}")]
    Decode(String),

    #[error("response is missing {0}")]
    Incomplete(&'static str),
}

/// Where the current rates came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateSourceKind {
    OpenExchangeRates,
    Frankfurter,
    Fallback,
}

/// A remote exchange-rate provider. Rates are USD-based.
#[async_trait::async_trait]
pub trait RateSource: Send + Sync + 'static {
    fn kind(&self) -> RateSourceKind;

    async fn fetch(&self) -> Result<Rates, RateSourceError>;
}

const SYMBOLS: &str = "EUR,GBP,BRL";

#[derive(Deserialize)]
struct RatesBody {
    rates: BTreeMap<String, f64>,
}

/// Parse a `{"rates": {"EUR": 0.9, ...}}` body. EUR, GBP and BRL must all
/// be present; unknown codes are ignored.
pub(crate) fn parse_rates(body: &str) -> Result<Rates, RateSourceError> {
    let parsed: RatesBody =
        serde_json::from_str(body).map_err(|e| RateSourceError::Decode(e.to_string()))?;
    let mut rates = BTreeMap::new();
    for currency in [Currency::Eur, Currency::Gbp, Currency::Brl] {
        let rate = parsed
            .rates
            .get(currency.as_str())
            .copied()
            .filter(|r| r.is_finite() && *r > 0.0)
            .ok_or(RateSourceError::Incomplete(currency.as_str()))?;
        rates.insert(currency, rate);
    }
    Ok(Rates::new(rates))
}

async fn get_rates(http: &reqwest::Client, url: &str, query: &[(&str, &str)]) -> Result<Rates, RateSourceError> {
    let resp = http.get(url).query(query).send().await?;
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(RateSourceError::Server {
            status: status.as_u16(),
            message: body,
        });
    }
    parse_rates(&body)
}

/// openexchangerates.org, used only when an app id is configured.
pub struct OpenExchangeRates {
    http: reqwest::Client,
    base_url: String,
    app_id: String,
}

impl OpenExchangeRates {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self::with_base_url("https://openexchangerates.org/api", app_id)
    }

    pub fn with_base_url(base_url: &str, app_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            app_id: app_id.into(),
        }
    }
}

#[async_trait::async_trait]
impl RateSource for OpenExchangeRates {
    fn kind(&self) -> RateSourceKind {
        RateSourceKind::OpenExchangeRates
    }

    async fn fetch(&self) -> Result<Rates, RateSourceError> {
        let url = format!("{}/latest.json", self.base_url);
        get_rates(
            &self.http,
            &url,
            &[("app_id", self.app_id.as_str()), ("base", "USD"), ("symbols", SYMBOLS)],
        )
        .await
    }
}

/// api.frankfurter.app (ECB reference rates, no key).
pub struct Frankfurter {
    http: reqwest::Client,
    base_url: String,
}

impl Frankfurter {
    pub fn new() -> Self {
        Self::with_base_url("https://api.frankfurter.app")
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for Frankfurter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RateSource for Frankfurter {
    fn kind(&self) -> RateSourceKind {
        RateSourceKind::Frankfurter
    }

    async fn fetch(&self) -> Result<Rates, RateSourceError> {
        let url = format!("{}/latest", self.base_url);
        get_rates(&self.http, &url, &[("from", "USD"), ("to", SYMBOLS)]).await
    }
}
