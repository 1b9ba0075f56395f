//! Response Cache Module
//!
//! Specializes the TTL cache for API responses, keyed by (url, params).
//! One instance is shared by every caller in the process; clones are cheap
//! handles onto the same underlying store.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::backend::CacheBackend;
use crate::cache::{CacheStats, TtlCache};
use crate::models::ApiEnvelope;

// == Response Cache ==
/// Shared cache of API response envelopes.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    inner: Arc<RwLock<TtlCache<ApiEnvelope>>>,
}

impl ResponseCache {
    // == Constructors ==
    /// Creates a memory-only response cache.
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(TtlCache::new(max_entries, default_ttl))),
        }
    }

    /// Creates a response cache mirrored to a durable backend.
    pub fn with_backend(
        max_entries: usize,
        default_ttl: Duration,
        backend: Box<dyn CacheBackend>,
    ) -> Self {
        Self {
            inner: Arc::new(RwLock::new(TtlCache::with_backend(
                max_entries,
                default_ttl,
                backend,
            ))),
        }
    }

    // == Cache Key ==
    /// Canonical cache key for a request.
    ///
    /// Parameter objects are key-sorted recursively before serialization so
    /// logically identical parameter sets always map to the same key, no
    /// matter their construction order.
    pub fn cache_key(url: &str, params: Option<&Value>) -> String {
        match params {
            Some(params) if !params.is_null() => {
                format!("{}|{}", url, canonicalize(params))
            }
            _ => format!("{}|", url),
        }
    }

    // == Store ==
    /// Caches a response envelope under the canonical key.
    pub async fn store(
        &self,
        url: &str,
        params: Option<&Value>,
        envelope: ApiEnvelope,
        ttl: Option<Duration>,
    ) {
        let key = Self::cache_key(url, params);
        debug!(%key, "Caching response");
        self.inner.write().await.set(key, envelope, ttl);
    }

    // == Fetch ==
    /// Returns the cached envelope for a request, or `None` on miss.
    pub async fn fetch(&self, url: &str, params: Option<&Value>) -> Option<ApiEnvelope> {
        let key = Self::cache_key(url, params);
        self.inner.write().await.get(&key)
    }

    // == Invalidate ==
    /// Drops the cached envelope for one exact request.
    pub async fn invalidate(&self, url: &str, params: Option<&Value>) -> bool {
        let key = Self::cache_key(url, params);
        self.inner.write().await.delete(&key)
    }

    // == Invalidate By Pattern ==
    /// Drops every cached envelope whose key contains `pattern`.
    ///
    /// Deliberately coarse: after a mutation it is correct to drop too much
    /// and refetch, never to serve stale data.
    pub async fn invalidate_by_pattern(&self, pattern: &str) -> usize {
        let mut cache = self.inner.write().await;
        let matching: Vec<String> = cache
            .keys()
            .into_iter()
            .filter(|key| key.contains(pattern))
            .collect();

        let count = matching.len();
        for key in &matching {
            cache.delete(key);
        }

        if count > 0 {
            debug!(pattern, count, "Invalidated cached responses");
        }
        count
    }

    /// Removes every cached response.
    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    /// Removes expired entries; returns the number removed.
    pub async fn purge_expired(&self) -> usize {
        self.inner.write().await.purge_expired()
    }

    /// Current cache statistics.
    pub async fn stats(&self) -> CacheStats {
        self.inner.read().await.stats()
    }
}

/// Rebuilds a JSON value with all object keys sorted, recursively, and
/// returns its serialization.
fn canonicalize(value: &Value) -> String {
    fn sort(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                let mut sorted = serde_json::Map::new();
                for key in keys {
                    sorted.insert(key.clone(), sort(&map[key]));
                }
                Value::Object(sorted)
            }
            Value::Array(items) => Value::Array(items.iter().map(sort).collect()),
            other => other.clone(),
        }
    }

    sort(value).to_string()
}
