//! Rate limiter configuration and builder

use crate::error::{RateLimitError, RateLimitResult};
use rampart_store::serde_helpers::duration_secs;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the rate limiter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window
    pub max_requests: u64,
    /// Window duration, in whole seconds when serialized
    #[serde(with = "duration_secs")]
    pub window: Duration,
    /// Key prefix for storage
    pub key_prefix: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
            key_prefix: "rate_limit".to_string(),
        }
    }
}

impl RateLimitConfig {
    /// Create a new configuration builder
    pub fn builder() -> RateLimitConfigBuilder {
        RateLimitConfigBuilder::new()
    }

    /// 100 requests per 15 minutes, the default for a deployed service
    pub fn deployment_default() -> Self {
        Self {
            window: Duration::from_secs(900),
            ..Self::default()
        }
    }

    /// Store key for a client
    pub fn store_key(&self, client_key: &str) -> String {
        format!("{}:{}", self.key_prefix, client_key)
    }

    /// Reject quotas that could never admit a request
    pub fn validate(&self) -> RateLimitResult<()> {
        validate_quota(self.max_requests, self.window)
    }
}

pub(crate) fn validate_quota(max_requests: u64, window: Duration) -> RateLimitResult<()> {
    if max_requests == 0 {
        return Err(RateLimitError::config("max_requests must be greater than 0"));
    }
    if window.is_zero() {
        return Err(RateLimitError::config("window must be non-zero"));
    }
    Ok(())
}

/// Builder for [`RateLimitConfig`]
#[derive(Debug, Default)]
pub struct RateLimitConfigBuilder {
    config: RateLimitConfig,
}

impl RateLimitConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum requests per window
    pub fn max_requests(mut self, max_requests: u64) -> Self {
        self.config.max_requests = max_requests;
        self
    }

    /// Set the window duration
    pub fn window(mut self, window: Duration) -> Self {
        self.config.window = window;
        self
    }

    /// Set both at once
    pub fn sliding_window(self, max_requests: u64, window: Duration) -> Self {
        self.max_requests(max_requests).window(window)
    }

    /// Set the key prefix for storage
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.key_prefix = prefix.into();
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> RateLimitResult<RateLimitConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RateLimitConfig::default();
        assert_eq!(config.max_requests, 100);
        assert_eq!(config.window, Duration::from_secs(60));
        assert_eq!(config.store_key("10.0.0.1"), "rate_limit:10.0.0.1");

        let deployed = RateLimitConfig::deployment_default();
        assert_eq!(deployed.max_requests, 100);
        assert_eq!(deployed.window, Duration::from_secs(900));
    }

    #[test]
    fn test_builder() {
        let config = RateLimitConfig::builder()
            .sliding_window(3, Duration::from_secs(10))
            .key_prefix("api")
            .build()
            .unwrap();

        assert_eq!(config.max_requests, 3);
        assert_eq!(config.store_key("k"), "api:k");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: RateLimitConfig =
            serde_json::from_str(r#"{"max_requests": 5, "window": 30}"#).unwrap();
        assert_eq!(config.max_requests, 5);
        assert_eq!(config.window, Duration::from_secs(30));
        assert_eq!(config.key_prefix, "rate_limit");

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["window"], 30);
    }

    #[test]
    fn test_builder_rejects_zero() {
        assert!(RateLimitConfig::builder().max_requests(0).build().is_err());
        assert!(
            RateLimitConfig::builder()
                .window(Duration::ZERO)
                .build()
                .is_err()
        );
    }
}
