use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use storefront_core::now_rfc3339;
use storefront_kv::{KVStore, get_json, set_json};

use super::{Currency, RateSource, RateSourceKind, Rates, convert_price};

/// KV key of the last good snapshot.
pub const RATES_KEY: &str = "currency/rates";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateSnapshot {
    pub rates: Rates,
    pub source: RateSourceKind,
    pub updated_at: String,
}

impl RateSnapshot {
    pub fn fallback() -> Self {
        Self {
            rates: Rates::fallback(),
            source: RateSourceKind::Fallback,
            updated_at: now_rfc3339(),
        }
    }
}

/// Holds the current exchange rates and refreshes them from the configured
/// sources in order.
pub struct RateBook {
    current: RwLock<RateSnapshot>,
    sources: Vec<Arc<dyn RateSource>>,
    kv: Arc<dyn KVStore>,
}

impl RateBook {
    /// Start from the persisted snapshot, or the fallback table.
    pub fn new(sources: Vec<Arc<dyn RateSource>>, kv: Arc<dyn KVStore>) -> Self {
        let current = match get_json::<RateSnapshot>(kv.as_ref(), RATES_KEY) {
            Ok(Some(snap)) if snap.rates.is_complete() => {
                info!(source = ?snap.source, updated_at = %snap.updated_at, "loaded saved exchange rates");
                snap
            }
            Ok(_) => RateSnapshot::fallback(),
            Err(e) => {
                warn!("saved exchange rates unreadable: {}", e);
                RateSnapshot::fallback()
            }
        };
        Self {
            current: RwLock::new(current),
            sources,
            kv,
        }
    }

    pub fn snapshot(&self) -> RateSnapshot {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn rates(&self) -> Rates {
        self.snapshot().rates
    }

    pub fn convert(&self, usd: f64, currency: Currency) -> f64 {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        convert_price(usd, currency, &current.rates)
    }

    /// Try each source in order and keep the first complete answer.
    ///
    /// When every source fails the previous good snapshot stays in place;
    /// without one the fallback table is used.
    pub async fn refresh(&self) -> RateSnapshot {
        for source in &self.sources {
            match source.fetch().await {
                Ok(rates) if rates.is_complete() => {
                    let snap = RateSnapshot {
                        rates,
                        source: source.kind(),
                        updated_at: now_rfc3339(),
                    };
                    if let Err(e) = set_json(self.kv.as_ref(), RATES_KEY, &snap) {
                        warn!("failed to persist exchange rates: {}", e);
                    }
                    info!(source = ?snap.source, "exchange rates refreshed");
                    *self.current.write().unwrap_or_else(PoisonError::into_inner) = snap.clone();
                    return snap;
                }
                Ok(_) => warn!(source = ?source.kind(), "incomplete exchange rates, trying next source"),
                Err(e) => warn!(source = ?source.kind(), "exchange rate fetch failed: {}", e),
            }
        }

        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if current.source == RateSourceKind::Fallback {
            warn!("no exchange rate source reachable, using fallback rates");
            *current = RateSnapshot::fallback();
        } else {
            warn!(source = ?current.source, "no exchange rate source reachable, keeping last rates");
        }
        current.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use storefront_kv::RedbStore;

    use super::*;
    use crate::currency::RateSourceError;

    struct Fixed {
        kind: RateSourceKind,
        eur: Option<f64>,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn ok(kind: RateSourceKind, eur: f64) -> Arc<Self> {
            Arc::new(Self { kind, eur: Some(eur), calls: AtomicUsize::new(0) })
        }

        fn failing(kind: RateSourceKind) -> Arc<Self> {
            Arc::new(Self { kind, eur: None, calls: AtomicUsize::new(0) })
        }
    }

    #[async_trait::async_trait]
    impl RateSource for Fixed {
        fn kind(&self) -> RateSourceKind {
            self.kind
        }

        async fn fetch(&self) -> Result<Rates, RateSourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.eur {
                Some(eur) => Ok(Rates::new(BTreeMap::from([
                    (Currency::Eur, eur),
                    (Currency::Gbp, 0.8),
                    (Currency::Brl, 5.0),
                ]))),
                None => Err(RateSourceError::Decode("boom".into())),
            }
        }
    }

    fn kv() -> (Arc<dyn KVStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let kv = RedbStore::open(&dir.path().join("kv.redb")).unwrap();
        (Arc::new(kv), dir)
    }

    #[tokio::test]
    async fn first_working_source_wins() {
        let (kv, _dir) = kv();
        let primary = Fixed::failing(RateSourceKind::OpenExchangeRates);
        let secondary = Fixed::ok(RateSourceKind::Frankfurter, 0.5);
        let sources: Vec<Arc<dyn RateSource>> = vec![primary.clone(), secondary.clone()];
        let book = RateBook::new(sources, kv);

        let snap = book.refresh().await;
        assert_eq!(snap.source, RateSourceKind::Frankfurter);
        assert_eq!(book.convert(10.0, Currency::Eur), 5.0);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn all_failing_uses_fallback() {
        let (kv, _dir) = kv();
        let book = RateBook::new(vec![Fixed::failing(RateSourceKind::Frankfurter) as Arc<dyn RateSource>], kv);
        let snap = book.refresh().await;
        assert_eq!(snap.source, RateSourceKind::Fallback);
        assert_eq!(snap.rates.get(Currency::Brl), Some(5.60));
    }

    #[tokio::test]
    async fn good_snapshot_survives_outage_and_restart() {
        let (kv, _dir) = kv();
        let up: Arc<dyn RateSource> = Fixed::ok(RateSourceKind::Frankfurter, 0.5);
        let book = RateBook::new(vec![up], kv.clone());
        book.refresh().await;

        // Restart with every source down: the saved rates are reloaded.
        let down: Arc<dyn RateSource> = Fixed::failing(RateSourceKind::Frankfurter);
        let book = RateBook::new(vec![down], kv);
        assert_eq!(book.snapshot().source, RateSourceKind::Frankfurter);
        let snap = book.refresh().await;
        assert_eq!(snap.source, RateSourceKind::Frankfurter);
        assert_eq!(snap.rates.get(Currency::Eur), Some(0.5));
    }
}
