//! In-memory response cache keyed by [`crate::core::cache_key`].

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::data::ApiPayload;
use crate::effects::lock;

/// Default time-to-live for a cached response.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub data: ApiPayload,
    pub stored_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) > self.ttl
    }
}

/// Entries are replaced wholesale and never mutated in place. Expired entries
/// are evicted when read.
#[derive(Debug)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    default_ttl: Duration,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl ResponseCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn get(&self, key: &str) -> Option<ApiPayload> {
        let mut entries = lock(&self.entries);
        let expired = entries.get(key)?.is_expired(Instant::now());
        if expired {
            entries.remove(key);
            debug!(key, "cache entry expired");
            return None;
        }
        entries.get(key).map(|entry| entry.data.clone())
    }

    pub fn set(&self, key: impl Into<String>, data: ApiPayload, ttl: Option<Duration>) {
        let key = key.into();
        let entry = CacheEntry {
            key: key.clone(),
            data,
            stored_at: Instant::now(),
            ttl: ttl.unwrap_or(self.default_ttl),
        };
        lock(&self.entries).insert(key, entry);
    }

    /// Remove every key containing `pattern`, or everything for `None`.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate(&self, pattern: Option<&str>) -> usize {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        match pattern {
            Some(pattern) => entries.retain(|key, _| !key.contains(pattern)),
            None => entries.clear(),
        }
        let removed = before - entries.len();
        debug!(pattern, removed, "cache invalidated");
        removed
    }

    pub fn clear(&self) {
        lock(&self.entries).clear();
    }

    /// Whether a live (unexpired) entry exists. Does not evict.
    pub fn contains(&self, key: &str) -> bool {
        lock(&self.entries)
            .get(key)
            .is_some_and(|entry| !entry.is_expired(Instant::now()))
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
