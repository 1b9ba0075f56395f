//! Configuration Module
//!
//! Handles loading and managing client configuration from environment
//! variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Client configuration parameters.
///
/// All values can be configured via environment variables with sensible
/// defaults.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every request path is joined onto
    pub base_url: String,
    /// Network call ceiling in seconds
    pub timeout_secs: u64,
    /// Maximum number of cached responses
    pub cache_max_entries: usize,
    /// Default response TTL in seconds
    pub cache_default_ttl_secs: u64,
    /// Retry budget applied when a request does not specify one
    pub default_retry: u32,
    /// Base backoff delay in milliseconds
    pub default_retry_delay_ms: u64,
    /// Interval of the background expired-entry sweep in seconds
    pub sweep_interval_secs: u64,
    /// Durable cache root; None keeps the cache memory-only
    pub cache_dir: Option<PathBuf>,
}

impl ClientConfig {
    /// Creates a new ClientConfig by loading values from environment
    /// variables.
    ///
    /// # Environment Variables
    /// - `API_BASE_URL` - Base URL (default: http://127.0.0.1:8080/api)
    /// - `API_TIMEOUT_SECS` - Request timeout (default: 30)
    /// - `CACHE_MAX_ENTRIES` - Cached response bound (default: 50)
    /// - `CACHE_DEFAULT_TTL` - Response TTL in seconds (default: 300)
    /// - `API_RETRY` - Default retry budget (default: 0)
    /// - `API_RETRY_DELAY_MS` - Base backoff delay (default: 1000)
    /// - `CACHE_SWEEP_INTERVAL` - Sweep interval in seconds (default: 60)
    /// - `CACHE_DIR` - Durable cache root (default: unset, memory-only)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env::var("API_BASE_URL").unwrap_or(defaults.base_url),
            timeout_secs: env::var("API_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
            cache_max_entries: env::var("CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_max_entries),
            cache_default_ttl_secs: env::var("CACHE_DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_default_ttl_secs),
            default_retry: env::var("API_RETRY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_retry),
            default_retry_delay_ms: env::var("API_RETRY_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_retry_delay_ms),
            sweep_interval_secs: env::var("CACHE_SWEEP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.sweep_interval_secs),
            cache_dir: env::var("CACHE_DIR").ok().map(PathBuf::from),
        }
    }

    /// Request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Default response TTL as a Duration.
    pub fn cache_default_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_default_ttl_secs)
    }

    /// Base backoff delay as a Duration.
    pub fn default_retry_delay(&self) -> Duration {
        Duration::from_millis(self.default_retry_delay_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/api".to_string(),
            timeout_secs: 30,
            cache_max_entries: 50,
            cache_default_ttl_secs: 300,
            default_retry: 0,
            default_retry_delay_ms: 1000,
            sweep_interval_secs: 60,
            cache_dir: None,
        }
    }
}
