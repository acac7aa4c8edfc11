//! Shared store error types.

use std::time::Duration;
use thiserror::Error;

/// Result type for shared store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Shared store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Command error.
    #[error("Command error: {0}")]
    Command(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Timeout error.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The store was never reachable or has been marked unavailable.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Underlying Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl StoreError {
    /// Create a new command error
    pub fn command<S: Into<String>>(msg: S) -> Self {
        Self::Command(msg.into())
    }

    /// Create a new unavailable error
    pub fn unavailable<S: Into<String>>(msg: S) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Check if this error indicates the store could not be reached.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout(_) | Self::Unavailable(_) => true,
            Self::Redis(e) => e.is_connection_refusal() || e.is_timeout() || e.is_io_error(),
            _ => false,
        }
    }
}
