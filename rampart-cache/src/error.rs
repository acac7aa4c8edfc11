//! Error types for cache operations.

use rampart_store::StoreError;
use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-specific errors.
///
/// These never escape [`CacheService`](crate::CacheService): a failing
/// cache is logged and bypassed.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Shared store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
