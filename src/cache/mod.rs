//! Cache Module
//!
//! Provides TTL caching with age-based eviction, optional durable
//! persistence, and the response-cache specialization used by the HTTP
//! client.

mod backend;
mod entry;
mod response;
mod stats;
mod store;


// Re-export public types
pub use backend::{CacheBackend, FileBackend, PersistedEntry};
pub use entry::{current_timestamp_ms, CacheEntry};
pub use response::ResponseCache;
pub use stats::CacheStats;
pub use store::TtlCache;

// == Public Constants ==
/// Namespace for durable cache storage (directory name under the
/// configured cache root).
pub const CACHE_NAMESPACE: &str = "certman_api_cache";
