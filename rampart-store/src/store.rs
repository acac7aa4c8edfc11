//! Shared store trait definition.

use crate::error::StoreResult;
use async_trait::async_trait;
use std::time::Duration;

/// Result of an atomic sliding-window update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSnapshot {
    /// Entries in the window after the update, including the one just added.
    pub count: u64,
    /// Score (timestamp) of the oldest surviving entry.
    pub oldest: Option<f64>,
}

/// Key-value / sorted-set store shared between instances.
///
/// Implementations must be safe to call concurrently. Any method may fail at
/// any time; callers are expected to degrade rather than propagate.
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Check that the store is reachable.
    async fn ping(&self) -> StoreResult<()>;

    /// Get a string value.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Set a string value, optionally with an expiry.
    ///
    /// Setting without a TTL clears any previous expiry on the key.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()>;

    /// Delete a key. Returns whether it existed.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Increment an integer value, creating it at zero if missing.
    async fn incr(&self, key: &str, delta: i64) -> StoreResult<i64>;

    /// Set the expiry of an existing key. Returns whether the key existed.
    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool>;

    /// Remaining time to live. `None` if the key is missing or never expires.
    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>>;

    /// Add or update a sorted-set member.
    async fn zadd(&self, key: &str, member: &str, score: f64) -> StoreResult<()>;

    /// Members with `min <= score <= max`, ordered by score.
    async fn zrange_by_score(&self, key: &str, min: f64, max: f64)
    -> StoreResult<Vec<(String, f64)>>;

    /// Remove members with `min <= score <= max`. Returns how many were removed.
    async fn zrem_range_by_score(&self, key: &str, min: f64, max: f64) -> StoreResult<u64>;

    /// Number of members in a sorted set.
    async fn zcard(&self, key: &str) -> StoreResult<u64>;

    /// Sliding-window update executed as a single atomic unit:
    ///
    /// 1. remove members with `score <= cutoff`
    /// 2. add `member` at `now`
    /// 3. count the members
    /// 4. set the key's expiry to `ttl`
    ///
    /// and report the oldest surviving score alongside the count.
    async fn record_window(
        &self,
        key: &str,
        member: &str,
        now: f64,
        cutoff: f64,
        ttl: Duration,
    ) -> StoreResult<WindowSnapshot>;

    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;
}
