//! Machine-readable rejection bodies.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP status for a rate limit rejection.
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// HTTP status for an open circuit.
pub const STATUS_SERVICE_UNAVAILABLE: u16 = 503;

/// HTTP status for a failure on our side.
pub const STATUS_INTERNAL_ERROR: u16 = 500;

/// JSON error body: `{"error": "...", "retry_after": 57}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Human-readable reason.
    pub error: String,
    /// Whole seconds the client should wait before retrying.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    /// Extra detail for operation failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorPayload {
    /// Body for a rate limit rejection.
    pub fn rate_limited(retry_after: Duration) -> Self {
        Self::rejected("Rate limit exceeded", retry_after)
    }

    /// Body for an open circuit.
    pub fn service_unavailable(retry_after: Duration) -> Self {
        Self::rejected("Service temporarily unavailable", retry_after)
    }

    /// Body for a failed operation.
    pub fn failed(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            retry_after: None,
            details: Some(details.into()),
        }
    }

    fn rejected(error: &str, retry_after: Duration) -> Self {
        Self {
            error: error.to_string(),
            retry_after: Some(retry_after.as_secs()),
            details: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_json() {
        let payload = ErrorPayload::rate_limited(Duration::from_secs(57));
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"error": "Rate limit exceeded", "retry_after": 57})
        );
    }

    #[test]
    fn test_failed_json() {
        let payload = ErrorPayload::failed("Translation failed", "upstream timeout");
        let json = serde_json::to_string(&payload).unwrap();

        assert!(json.contains("\"details\":\"upstream timeout\""));
        assert!(!json.contains("retry_after"));
    }
}
