//! Response Envelope
//!
//! Every backend response carries a uniform `{code, message, data}` wrapper.
//! A `code` of 200 signals business success; any other code is a business
//! failure even when the HTTP status is 200.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, Result};

/// Business success code used by the backend envelope.
pub const BUSINESS_OK: i64 = 200;

// == Api Envelope ==
/// The uniform response wrapper returned by every backend endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiEnvelope {
    /// Business status code (200 = success)
    pub code: i64,
    /// Human-readable status message
    #[serde(default)]
    pub message: String,
    /// Endpoint-specific payload
    #[serde(default)]
    pub data: Value,
}

impl ApiEnvelope {
    /// Creates a success envelope wrapping the given payload.
    pub fn ok(data: Value) -> Self {
        Self {
            code: BUSINESS_OK,
            message: String::new(),
            data,
        }
    }

    // == Is Success ==
    /// Whether the envelope signals business success.
    pub fn is_success(&self) -> bool {
        self.code == BUSINESS_OK
    }

    // == Data As ==
    /// Deserializes the `data` payload into a concrete type.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.data.clone()).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_deserialize() {
        let json = r#"{"code": 200, "message": "ok", "data": {"id": 5}}"#;
        let env: ApiEnvelope = serde_json::from_str(json).unwrap();
        assert!(env.is_success());
        assert_eq!(env.message, "ok");
        assert_eq!(env.data["id"], 5);
    }

    #[test]
    fn test_envelope_defaults() {
        // message and data are optional on the wire
        let env: ApiEnvelope = serde_json::from_str(r#"{"code": 200}"#).unwrap();
        assert!(env.is_success());
        assert!(env.message.is_empty());
        assert!(env.data.is_null());
    }

    #[test]
    fn test_envelope_business_failure() {
        let env: ApiEnvelope =
            serde_json::from_str(r#"{"code": 4001, "message": "duplicate"}"#).unwrap();
        assert!(!env.is_success());
    }

    #[test]
    fn test_data_as_typed() {
        #[derive(Deserialize)]
        struct Cert {
            id: u64,
            domain: String,
        }

        let env = ApiEnvelope::ok(json!({"id": 42, "domain": "example.com"}));
        let cert: Cert = env.data_as().unwrap();
        assert_eq!(cert.id, 42);
        assert_eq!(cert.domain, "example.com");
    }

    #[test]
    fn test_data_as_mismatch() {
        let env = ApiEnvelope::ok(json!("not an object"));
        let result: Result<Vec<u64>> = env.data_as();
        assert!(result.is_err());
    }
}
