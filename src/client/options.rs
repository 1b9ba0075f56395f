//! Request Options
//!
//! Per-request knobs recognized by every client method: caching, retry
//! budget, backoff delay, error-surfacing mode, extra headers and query
//! parameters.

use std::time::Duration;

use serde_json::Value;

// == Cache Policy ==
/// Whether and how long to cache a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CachePolicy {
    /// Do not consult or populate the response cache
    #[default]
    Off,
    /// Cache with the client's default TTL
    DefaultTtl,
    /// Cache with an explicit TTL
    Ttl(Duration),
}

impl CachePolicy {
    /// Whether the response cache participates at all.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, CachePolicy::Off)
    }

    /// The per-request TTL override, if one was given.
    pub fn ttl_override(&self) -> Option<Duration> {
        match self {
            CachePolicy::Ttl(ttl) => Some(*ttl),
            _ => None,
        }
    }
}

// == Request Options ==
/// Options accepted by every request method.
///
/// Unset retry fields fall back to the client-level defaults.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Response caching mode (reads only; writes never cache)
    pub cache: CachePolicy,
    /// Retry budget; None uses the client default
    pub retry: Option<u32>,
    /// Base backoff delay; None uses the client default
    pub retry_delay: Option<Duration>,
    /// Suppress the user-facing failure notification
    pub silent: bool,
    /// Extra headers appended to the request
    pub headers: Vec<(String, String)>,
    /// Query parameters (a JSON object); also part of the cache key
    pub params: Option<Value>,
}

impl RequestOptions {
    /// Creates options with every field at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables caching with the client default TTL.
    pub fn cached(mut self) -> Self {
        self.cache = CachePolicy::DefaultTtl;
        self
    }

    /// Enables caching with an explicit TTL.
    pub fn cached_for(mut self, ttl: Duration) -> Self {
        self.cache = CachePolicy::Ttl(ttl);
        self
    }

    /// Sets the retry budget.
    pub fn retry(mut self, budget: u32) -> Self {
        self.retry = Some(budget);
        self
    }

    /// Sets the base backoff delay.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    /// Suppresses the user-facing failure notification.
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    /// Appends one extra header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the query parameters.
    pub fn params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }
}
