//! Circuit breaker errors.

use std::time::Duration;
use thiserror::Error;

/// Circuit breaker error.
#[derive(Debug, Error)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open, request was rejected without running the operation.
    #[error("Circuit breaker is open. Retry after {retry_after:?}")]
    Open {
        /// Time until the circuit will admit a probe, in whole seconds.
        retry_after: Duration,
    },
    /// Request was executed but failed. The error is passed through untouched.
    #[error("Execution failed: {0}")]
    Execution(E),
}

impl<E> CircuitBreakerError<E> {
    /// Whether the request was rejected by the breaker.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    /// Retry hint, if rejected.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Open { retry_after } => Some(*retry_after),
            Self::Execution(_) => None,
        }
    }

    /// The operation's own error, if it ran and failed.
    pub fn into_execution(self) -> Option<E> {
        match self {
            Self::Execution(e) => Some(e),
            Self::Open { .. } => None,
        }
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Circuit breaker configuration error: {0}")]
pub struct ConfigError(pub String);
