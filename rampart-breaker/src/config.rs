//! Circuit breaker configuration.

use crate::error::ConfigError;
use std::time::Duration;

/// Circuit breaker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Name of the circuit breaker (for logging).
    pub name: String,
    /// Number of consecutive failures before opening the circuit.
    pub failure_threshold: u32,
    /// Time to wait before transitioning from open to half-open.
    pub reset_timeout: Duration,
    /// Probation length before half-open closes on its own.
    pub half_open_timeout: Duration,
    /// Shared store key the state is mirrored under.
    pub state_key: String,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(60),
            half_open_timeout: Duration::from_secs(30),
            state_key: "circuit_state".to_string(),
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a new configuration with a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the failure threshold.
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Set the reset timeout.
    pub fn reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }

    /// Set the half-open probation timeout.
    pub fn half_open_timeout(mut self, timeout: Duration) -> Self {
        self.half_open_timeout = timeout;
        self
    }

    /// Set the mirrored state key.
    pub fn state_key(mut self, key: impl Into<String>) -> Self {
        self.state_key = key.into();
        self
    }

    /// Check the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.failure_threshold == 0 {
            return Err(ConfigError("failure_threshold must be greater than 0".into()));
        }
        if self.reset_timeout.is_zero() {
            return Err(ConfigError("reset_timeout must be non-zero".into()));
        }
        if self.half_open_timeout.is_zero() {
            return Err(ConfigError("half_open_timeout must be non-zero".into()));
        }
        if self.state_key.is_empty() {
            return Err(ConfigError("state_key must not be empty".into()));
        }
        Ok(())
    }

    /// Mirror TTL for a state. Closed never expires.
    pub(crate) fn ttl_for(&self, state: crate::CircuitState) -> Option<Duration> {
        match state {
            crate::CircuitState::Open => Some(self.reset_timeout),
            crate::CircuitState::HalfOpen => Some(self.half_open_timeout),
            crate::CircuitState::Closed => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CircuitState;

    #[test]
    fn test_defaults() {
        let config = CircuitBreakerConfig::default();
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.reset_timeout, Duration::from_secs(60));
        assert_eq!(config.half_open_timeout, Duration::from_secs(30));
        assert_eq!(config.state_key, "circuit_state");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_chained_setters() {
        let config = CircuitBreakerConfig::new("translate")
            .failure_threshold(2)
            .reset_timeout(Duration::from_secs(10))
            .state_key("translate:circuit");

        assert_eq!(config.name, "translate");
        assert_eq!(config.ttl_for(CircuitState::Open), Some(Duration::from_secs(10)));
        assert_eq!(config.ttl_for(CircuitState::Closed), None);
    }

    #[test]
    fn test_validate() {
        assert!(CircuitBreakerConfig::default().failure_threshold(0).validate().is_err());
        assert!(
            CircuitBreakerConfig::default()
                .reset_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(CircuitBreakerConfig::default().state_key("").validate().is_err());
    }
}
