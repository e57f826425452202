//! Read-through TTL cache for report results.
//!
//! Keyed on the full query (text plus binds), so two reports differing
//! only in a bound date never share an entry. Failed fetches are passed
//! through without being stored; a transient warehouse error never
//! shadows a later success for the cache lifetime.

use crate::executor::ReportData;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

struct CacheEntry {
    inserted: Instant,
    data: ReportData,
}

/// In-memory cache with a fixed time-to-live per entry.
pub struct ReportCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ReportCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value for `key` if present and fresh.
    pub fn get(&self, key: &str) -> Option<ReportData> {
        let entries = self.entries.lock().expect("cache lock poisoned");
        entries
            .get(key)
            .filter(|entry| entry.inserted.elapsed() < self.ttl)
            .map(|entry| entry.data.clone())
    }

    /// Stores a successful result. Failed results are ignored.
    pub fn put(&self, key: String, data: &ReportData) {
        if !data.is_ok() {
            return;
        }
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(
            key,
            CacheEntry {
                inserted: Instant::now(),
                data: data.clone(),
            },
        );
    }

    /// Looks up `key`, falling back to `fetch` on a miss or stale entry.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> ReportData
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = ReportData>,
    {
        if let Some(hit) = self.get(key) {
            debug!(key_len = key.len(), "report cache hit");
            return hit;
        }
        let data = fetch().await;
        self.put(key.to_string(), &data);
        data
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.lock().expect("cache lock poisoned").clear();
    }

    /// Number of stored entries, fresh or stale.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
