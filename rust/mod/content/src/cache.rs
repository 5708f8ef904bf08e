//! Tagged TTL cache for CMS query results.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use crate::client::QueryParams;

/// Default lifetime of a cached result.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Expired entries are swept once every this many inserts.
const PRUNE_EVERY: usize = 64;

#[derive(Debug, Clone)]
struct CachedResult {
    value: Value,
    tags: Vec<String>,
    expires_at: Instant,
}

pub struct QueryCache {
    entries: DashMap<String, CachedResult>,
    ttl: Duration,
    inserts: AtomicUsize,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            inserts: AtomicUsize::new(0),
        }
    }

    pub fn key(query: &str, params: &QueryParams) -> String {
        // Params are ordered, so equal inputs give equal keys.
        format!("{}\u{0}{}", query, serde_json::to_string(params).unwrap_or_default())
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let entry = self.entries.get(key)?;
        if entry.expires_at > Instant::now() {
            return Some(entry.value.clone());
        }
        drop(entry);
        self.entries.remove(key);
        None
    }

    /// Store a result. `null` (nothing found) is not cached.
    pub fn insert(&self, key: String, value: Value, tags: &[&str]) {
        if value.is_null() {
            return;
        }
        if self.inserts.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == 0 {
            self.prune();
        }
        self.entries.insert(
            key,
            CachedResult {
                value,
                tags: tags.iter().map(|t| t.to_string()).collect(),
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drop expired entries.
    pub fn prune(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    /// Drop every entry carrying any of `tags`. Returns how many were dropped.
    pub fn invalidate(&self, tags: &[String]) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !entry.tags.iter().any(|t| tags.contains(t)));
        let dropped = before.saturating_sub(self.entries.len());
        debug!(?tags, dropped, "cms cache invalidated");
        dropped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
