//! Client Module
//!
//! The request surface callers use: `get`/`post`/`put`/`delete`/`patch`/
//! `upload`/`download`, with caching, retry and token-refresh handled
//! underneath.

mod core;
mod options;
mod stages;

pub use self::core::HttpClient;
pub use options::{CachePolicy, RequestOptions};
pub use stages::TRACE_HEADER;
