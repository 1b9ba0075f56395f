//! Error types for the API client
//!
//! Provides unified error handling using thiserror.
//!
//! A cache miss is deliberately absent from this enum: misses are a
//! control-flow state (`Option::None`) handled inside the client, never an
//! error surfaced to callers.

use thiserror::Error;

// == Api Error Enum ==
/// Unified error type for the API client.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Network-level failure: unreachable host, connection reset, timeout
    #[error("Network failure: {0}")]
    Transport(String),

    /// Authentication expired (HTTP 401)
    #[error("Authentication expired")]
    AuthExpired,

    /// Permission denied (HTTP 403)
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Resource not found (HTTP 404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Server fault (HTTP 5xx)
    #[error("Server fault (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// Any other non-success HTTP status (e.g. 400)
    #[error("Request failed (HTTP {status}): {message}")]
    Http { status: u16, message: String },

    /// Backend envelope carried a non-200 business code
    #[error("Business failure (code {code}): {message}")]
    Business { code: i64, message: String },

    /// Response body could not be decoded as the expected envelope
    #[error("Invalid response body: {0}")]
    Decode(String),

    /// Request could not be built or its payload could not be read
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == Error Category ==
/// Notification category for surfaced failures.
///
/// Each surfaced failure maps to exactly one category so the UI layer can
/// pick the right user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NetworkUnreachable,
    AuthExpired,
    PermissionDenied,
    NotFound,
    ServerError,
    Business,
    Generic,
}

impl ApiError {
    // == Is Retryable ==
    /// Whether the failure class is worth retrying.
    ///
    /// Only transport failures and server faults are transient; everything
    /// else is deterministic given the same input and must surface
    /// immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Transport(_) | ApiError::Server { .. })
    }

    // == Category ==
    /// Maps the error to its notification category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ApiError::Transport(_) => ErrorCategory::NetworkUnreachable,
            ApiError::AuthExpired => ErrorCategory::AuthExpired,
            ApiError::Forbidden(_) => ErrorCategory::PermissionDenied,
            ApiError::NotFound(_) => ErrorCategory::NotFound,
            ApiError::Server { .. } => ErrorCategory::ServerError,
            ApiError::Business { .. } => ErrorCategory::Business,
            ApiError::Http { .. } | ApiError::Decode(_) | ApiError::InvalidRequest(_) => {
                ErrorCategory::Generic
            }
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            ApiError::Transport(err.to_string())
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if err.is_builder() || err.is_request() {
            ApiError::InvalidRequest(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the API client.
pub type Result<T> = std::result::Result<T, ApiError>;
