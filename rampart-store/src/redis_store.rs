//! Redis-backed shared store.

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::store::{SharedStore, WindowSnapshot};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisResult};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, trace};

/// Redis shared store.
///
/// Commands go through a [`ConnectionManager`], which reconnects on its own
/// after the store comes back; every command is bounded by the configured
/// command timeout.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    command_timeout: Duration,
    url: String,
}

impl RedisStore {
    /// Connect and verify the store with a PING.
    ///
    /// Both the connection attempt and the PING are bounded by
    /// `config.connect_timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the connection cannot be
    /// established in time, or the PING fails.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let url = config.redacted_url();
        debug!(url = %url, timeout = ?config.connect_timeout, "Connecting to shared store");

        let client = Client::open(config.connection_url())
            .map_err(|e| StoreError::Config(e.to_string()))?;

        let conn = tokio::time::timeout(config.connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| StoreError::Timeout(config.connect_timeout))?
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let store = Self {
            conn,
            command_timeout: config.command_timeout,
            url,
        };

        // Test the connection before handing the store out
        tokio::time::timeout(config.connect_timeout, store.ping_raw())
            .await
            .map_err(|_| StoreError::Timeout(config.connect_timeout))?
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        info!(url = %store.url, "Shared store connected");
        Ok(store)
    }

    async fn ping_raw(&self) -> RedisResult<String> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async(&mut conn).await
    }

    /// Run a command under the command timeout.
    async fn bounded<T, F>(&self, fut: F) -> StoreResult<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        tokio::time::timeout(self.command_timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout(self.command_timeout))?
            .map_err(StoreError::from)
    }
}

/// Whole seconds for EXPIRE, rounded up and never zero.
fn expire_secs(ttl: Duration) -> i64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1) as i64
}

#[async_trait]
impl SharedStore for RedisStore {
    async fn ping(&self) -> StoreResult<()> {
        let _: String = self.bounded(self.ping_raw()).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        self.bounded(conn.get(key)).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(ttl) => {
                let secs = expire_secs(ttl) as u64;
                self.bounded(conn.set_ex::<_, _, ()>(key, value, secs)).await
            }
            None => self.bounded(conn.set::<_, _, ()>(key, value)).await,
        }
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let deleted: u32 = self.bounded(conn.del(key)).await?;
        Ok(deleted > 0)
    }

    async fn incr(&self, key: &str, delta: i64) -> StoreResult<i64> {
        let mut conn = self.conn.clone();
        self.bounded(conn.incr(key, delta)).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        self.bounded(conn.expire(key, expire_secs(ttl))).await
    }

    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>> {
        let mut conn = self.conn.clone();
        let ttl: i64 = self.bounded(conn.ttl(key)).await?;

        // -2: missing key, -1: no expiry
        if ttl < 0 {
            Ok(None)
        } else {
            Ok(Some(Duration::from_secs(ttl as u64)))
        }
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: i64 = self.bounded(conn.zadd(key, member, score)).await?;
        Ok(())
    }

    async fn zrange_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> StoreResult<Vec<(String, f64)>> {
        let mut conn = self.conn.clone();
        self.bounded(conn.zrangebyscore_withscores(key, min, max))
            .await
    }

    async fn zrem_range_by_score(&self, key: &str, min: f64, max: f64) -> StoreResult<u64> {
        let mut conn = self.conn.clone();
        self.bounded(conn.zrembyscore(key, min, max)).await
    }

    async fn zcard(&self, key: &str) -> StoreResult<u64> {
        let mut conn = self.conn.clone();
        self.bounded(conn.zcard(key)).await
    }

    async fn record_window(
        &self,
        key: &str,
        member: &str,
        now: f64,
        cutoff: f64,
        ttl: Duration,
    ) -> StoreResult<WindowSnapshot> {
        trace!(key = %key, now = now, cutoff = cutoff, "Redis sliding window update");

        // MULTI/EXEC so concurrent callers on the same key never interleave
        let mut pipe = redis::pipe();
        pipe.atomic()
            .zrembyscore(key, "-inf", cutoff)
            .ignore()
            .zadd(key, member, now)
            .ignore()
            .zcard(key)
            .expire(key, expire_secs(ttl))
            .ignore()
            .zrange_withscores(key, 0, 0);

        let mut conn = self.conn.clone();
        let (count, oldest): (u64, Vec<(String, f64)>) =
            self.bounded(pipe.query_async(&mut conn)).await?;

        Ok(WindowSnapshot {
            count,
            oldest: oldest.first().map(|(_, score)| *score),
        })
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("url", &self.url)
            .field("command_timeout", &self.command_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    // Redis tests require a running Redis instance
    // Run with: cargo test -- --ignored

    use super::*;

    #[test]
    fn test_expire_secs_rounds_up() {
        assert_eq!(expire_secs(Duration::from_secs(60)), 60);
        assert_eq!(expire_secs(Duration::from_millis(1500)), 2);
        assert_eq!(expire_secs(Duration::ZERO), 1);
    }

    #[tokio::test]
    async fn test_connect_unreachable_times_out() {
        let config = StoreConfig::builder()
            // TEST-NET-1, never routable
            .host("192.0.2.1")
            .connect_timeout(Duration::from_millis(200))
            .build();

        let result = RedisStore::connect(&config).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().is_connection_error());
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_record_window() {
        let store = RedisStore::connect(&StoreConfig::default()).await.unwrap();
        let key = "rampart:test:window";
        store.delete(key).await.unwrap();

        let ttl = Duration::from_secs(60);
        let first = store.record_window(key, "a", 100.0, 40.0, ttl).await.unwrap();
        assert_eq!(first.count, 1);
        assert_eq!(first.oldest, Some(100.0));

        let second = store.record_window(key, "b", 101.0, 41.0, ttl).await.unwrap();
        assert_eq!(second.count, 2);
        assert_eq!(second.oldest, Some(100.0));

        // Everything at or before the cutoff is dropped
        let third = store.record_window(key, "c", 161.0, 101.0, ttl).await.unwrap();
        assert_eq!(third.count, 1);
        assert_eq!(third.oldest, Some(161.0));

        assert!(store.ttl(key).await.unwrap().is_some());
        store.delete(key).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_basic_operations() {
        let store = RedisStore::connect(&StoreConfig::default()).await.unwrap();

        store
            .set("rampart:test:key", "value", Some(Duration::from_secs(30)))
            .await
            .unwrap();
        let value = store.get("rampart:test:key").await.unwrap();
        assert_eq!(value.as_deref(), Some("value"));
        assert!(store.ttl("rampart:test:key").await.unwrap().is_some());

        assert!(store.delete("rampart:test:key").await.unwrap());
        assert_eq!(store.get("rampart:test:key").await.unwrap(), None);
    }
}
