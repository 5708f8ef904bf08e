//! Display currencies, exchange rates and price formatting.
//!
//! Catalog prices are stored in USD. Every other currency is derived from a
//! rate snapshot held by [`RateBook`].

mod book;
mod source;

pub use book::{RATES_KEY, RateBook, RateSnapshot};
pub use source::{Frankfurter, OpenExchangeRates, RateSource, RateSourceError, RateSourceKind};

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Brl,
}

impl Currency {
    pub const ALL: [Currency; 4] = [Currency::Usd, Currency::Eur, Currency::Gbp, Currency::Brl];

    /// ISO code, upper case.
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Brl => "BRL",
        }
    }

    /// Parse an ISO code, ignoring case.
    pub fn from_code(code: &str) -> Option<Self> {
        Currency::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(code.trim()))
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Gbp => "£",
            Currency::Brl => "R$",
        }
    }

    /// Rate used when no source is reachable.
    pub fn fallback_rate(&self) -> f64 {
        match self {
            Currency::Usd => 1.0,
            Currency::Eur => 0.93,
            Currency::Gbp => 0.79,
            Currency::Brl => 5.60,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// USD → currency multipliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rates(BTreeMap<Currency, f64>);

impl Rates {
    pub fn new(rates: BTreeMap<Currency, f64>) -> Self {
        let mut rates = rates;
        rates.insert(Currency::Usd, 1.0);
        Self(rates)
    }

    pub fn fallback() -> Self {
        Self(Currency::ALL.into_iter().map(|c| (c, c.fallback_rate())).collect())
    }

    pub fn get(&self, currency: Currency) -> Option<f64> {
        self.0.get(&currency).copied()
    }

    /// Every supported currency has a positive rate.
    pub fn is_complete(&self) -> bool {
        Currency::ALL
            .into_iter()
            .all(|c| self.get(c).is_some_and(|r| r.is_finite() && r > 0.0))
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Convert a USD price. A missing rate is logged and the USD amount returned.
pub fn convert_price(usd: f64, currency: Currency, rates: &Rates) -> f64 {
    if currency == Currency::Usd {
        return usd;
    }
    match rates.get(currency) {
        Some(rate) => round2(usd * rate),
        None => {
            error!(currency = %currency, "no exchange rate, using USD amount");
            usd
        }
    }
}

/// Smallest currency unit for the payment gateway.
pub fn price_to_cents(price: f64) -> i64 {
    (price * 100.0).round() as i64
}

/// Locale-style price: `$1,234.56`, `1.234,56 €`, `£1,234.56`, `R$ 1.234,56`.
pub fn format_price(price: f64, currency: Currency) -> String {
    let number = format_price_without_symbol(price, currency);
    match currency {
        Currency::Usd | Currency::Gbp => match number.strip_prefix('-') {
            Some(abs) => format!("-{}{}", currency.symbol(), abs),
            None => format!("{}{}", currency.symbol(), number),
        },
        Currency::Eur => format!("{} €", number),
        Currency::Brl => format!("R$ {}", number),
    }
}

/// Same grouping and decimals as [`format_price`], no symbol.
pub fn format_price_without_symbol(price: f64, currency: Currency) -> String {
    let (group, decimal) = match currency {
        Currency::Usd | Currency::Gbp => (',', '.'),
        Currency::Eur | Currency::Brl => ('.', ','),
    };
    let cents = price_to_cents(price);
    let negative = cents < 0;
    let cents = cents.unsigned_abs();
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(group);
        }
        grouped.push(ch);
    }

    format!(
        "{}{}{}{:02}",
        if negative { "-" } else { "" },
        grouped,
        decimal,
        cents % 100
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_parse_case_insensitively() {
        assert_eq!(Currency::from_code("eur"), Some(Currency::Eur));
        assert_eq!(Currency::from_code(" BRL "), Some(Currency::Brl));
        assert_eq!(Currency::from_code("JPY"), None);
        assert_eq!(serde_json::to_string(&Currency::Gbp).unwrap(), "\"GBP\"");
    }

    #[test]
    fn convert_uses_rate_and_rounds() {
        let rates = Rates::fallback();
        assert_eq!(convert_price(10.0, Currency::Usd, &rates), 10.0);
        assert_eq!(convert_price(10.0, Currency::Eur, &rates), 9.3);
        assert_eq!(convert_price(1.234, Currency::Brl, &rates), 6.91);
    }

    #[test]
    fn convert_without_rate_returns_usd() {
        let rates = Rates::new(BTreeMap::new());
        assert!(!rates.is_complete());
        assert_eq!(convert_price(4.5, Currency::Gbp, &rates), 4.5);
    }

    #[test]
    fn cents_round() {
        assert_eq!(price_to_cents(9.3), 930);
        assert_eq!(price_to_cents(19.99), 1999);
        assert_eq!(price_to_cents(12.0), 1200);
    }

    #[test]
    fn formats_per_locale() {
        assert_eq!(format_price(1234.56, Currency::Usd), "$1,234.56");
        assert_eq!(format_price(1234.56, Currency::Eur), "1.234,56 €");
        assert_eq!(format_price(1234.56, Currency::Gbp), "£1,234.56");
        assert_eq!(format_price(1234.56, Currency::Brl), "R$ 1.234,56");
        assert_eq!(format_price(5.0, Currency::Usd), "$5.00");
        assert_eq!(format_price(1234567.891, Currency::Usd), "$1,234,567.89");
        assert_eq!(format_price(-3.5, Currency::Gbp), "-£3.50");
    }

    #[test]
    fn formats_without_symbol() {
        assert_eq!(format_price_without_symbol(1234.56, Currency::Usd), "1,234.56");
        assert_eq!(format_price_without_symbol(1234.56, Currency::Brl), "1.234,56");
        assert_eq!(format_price_without_symbol(0.5, Currency::Eur), "0,50");
    }
}
