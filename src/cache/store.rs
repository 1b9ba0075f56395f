//! Cache Store Module
//!
//! Generic TTL cache combining HashMap storage with age-based eviction and
//! optional durable write-through.

use std::collections::HashMap;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::backend::{CacheBackend, PersistedEntry};
use crate::cache::entry::current_timestamp_ms;
use crate::cache::{CacheEntry, CacheStats};

// == Ttl Cache ==
/// Bounded key-value cache with per-entry expiry.
///
/// Lookups of expired entries behave as misses and remove the entry lazily.
/// When the live-entry count exceeds `max_entries` after an insert, the
/// oldest entries by creation time are dropped first (pure age order, not
/// access order).
#[derive(Debug)]
pub struct TtlCache<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// TTL applied to entries stored without an explicit TTL
    default_ttl: Duration,
    /// Optional durable mirror
    backend: Option<Box<dyn CacheBackend>>,
}

impl<V> TtlCache<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    // == Constructor ==
    /// Creates a memory-only cache with the given bound and default TTL.
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::new(),
            max_entries,
            default_ttl,
            backend: None,
        }
    }

    /// Creates a cache mirrored to a durable backend, replaying any live
    /// persisted entries into memory first.
    pub fn with_backend(
        max_entries: usize,
        default_ttl: Duration,
        backend: Box<dyn CacheBackend>,
    ) -> Self {
        let mut cache = Self {
            entries: HashMap::new(),
            stats: CacheStats::new(),
            max_entries,
            default_ttl,
            backend: Some(backend),
        };
        cache.hydrate();
        cache
    }

    /// Replays live backend entries into memory; dead or undecodable
    /// entries are dropped from the backend.
    fn hydrate(&mut self) {
        let backend = match &self.backend {
            Some(backend) => backend,
            None => return,
        };

        let now = current_timestamp_ms();
        let mut restored: Vec<(String, CacheEntry<V>)> = Vec::new();
        let mut dead: Vec<String> = Vec::new();

        for persisted in backend.hydrate() {
            if persisted.expires_at <= now {
                dead.push(persisted.key);
                continue;
            }
            match serde_json::from_value::<V>(persisted.value) {
                Ok(value) => restored.push((
                    persisted.key,
                    CacheEntry {
                        value,
                        created_at: persisted.created_at,
                        expires_at: persisted.expires_at,
                    },
                )),
                Err(e) => {
                    warn!(key = %persisted.key, error = %e, "Dropping undecodable persisted entry");
                    dead.push(persisted.key);
                }
            }
        }

        for key in dead {
            backend.remove(&key);
        }
        for (key, entry) in restored {
            self.entries.insert(key, entry);
        }

        self.enforce_bound();
        self.stats.set_total_entries(self.entries.len());
    }

    // == Set ==
    /// Stores a value with expiry `now + (ttl or default)`.
    ///
    /// Overwrites any existing entry for the key and triggers the eviction
    /// sweep.
    pub fn set(&mut self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let key = key.into();
        let ttl_ms = ttl.unwrap_or(self.default_ttl).as_millis() as u64;
        let entry = CacheEntry::new(value, ttl_ms);

        if let Some(backend) = &self.backend {
            match serde_json::to_value(&entry.value) {
                Ok(value) => backend.persist(&PersistedEntry {
                    key: key.clone(),
                    value,
                    created_at: entry.created_at,
                    expires_at: entry.expires_at,
                }),
                Err(e) => warn!(key = %key, error = %e, "Failed to serialize entry for persistence"),
            }
        }

        self.entries.insert(key, entry);
        self.sweep();
        self.stats.set_total_entries(self.entries.len());
    }

    // == Get ==
    /// Retrieves a live value by key.
    ///
    /// A miss is a first-class `None`; an expired entry is removed on the
    /// way out and reported as a miss.
    pub fn get(&mut self, key: &str) -> Option<V> {
        match self.entries.get(key) {
            Some(entry) if entry.is_live() => {
                self.stats.record_hit();
                Some(entry.value.clone())
            }
            Some(_) => {
                self.remove_entry(key);
                self.stats.record_expiration();
                self.stats.record_miss();
                self.stats.set_total_entries(self.entries.len());
                None
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Has ==
    /// Whether a live entry exists, with the same lazy-eviction side effect
    /// as `get`.
    pub fn has(&mut self, key: &str) -> bool {
        self.get(key).is_some()
    }

    // == Delete ==
    /// Removes an entry. Returns false (not an error) when absent.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.remove_entry(key);
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    // == Clear ==
    /// Removes all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
        if let Some(backend) = &self.backend {
            backend.clear();
        }
        self.stats.set_total_entries(0);
    }

    // == Keys ==
    /// Live keys, as a snapshot taken at call time.
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.is_live())
            .map(|(key, _)| key.clone())
            .collect()
    }

    // == Purge Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub fn purge_expired(&mut self) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired.len();
        for key in expired {
            self.remove_entry(&key);
            self.stats.record_expiration();
        }

        self.stats.set_total_entries(self.entries.len());
        count
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    /// Returns the current number of entries (live or not yet swept).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Eviction Sweep ==
    /// Drops expired entries, then the oldest-created entries until the
    /// size bound holds. Invoked on every `set`.
    fn sweep(&mut self) {
        let purged = self.purge_expired();
        if purged > 0 {
            debug!(purged, "Sweep removed expired cache entries");
        }
        self.enforce_bound();
    }

    /// Evicts oldest-created entries (key tie-break) while over the bound.
    fn enforce_bound(&mut self) {
        if self.entries.len() <= self.max_entries {
            return;
        }

        let mut by_age: Vec<(u64, String)> = self
            .entries
            .iter()
            .map(|(key, entry)| (entry.created_at, key.clone()))
            .collect();
        by_age.sort();

        let excess = self.entries.len() - self.max_entries;
        for (_, key) in by_age.into_iter().take(excess) {
            self.remove_entry(&key);
            self.stats.record_eviction();
        }
    }

    /// Removes one entry from memory and the backend.
    fn remove_entry(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            if let Some(backend) = &self.backend {
                backend.remove(key);
            }
        }
        removed
    }
}
