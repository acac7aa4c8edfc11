//! Cache-aside service.

use crate::config::CacheConfig;
use crate::helpers;
use rampart_store::StoreClient;
use serde::{Serialize, de::DeserializeOwned};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, trace, warn};

/// Get-or-compute memoization over the shared store.
///
/// The cache is strictly best-effort. A store that is down, a value that
/// no longer decodes, or a result that cannot be encoded all fall through
/// to the producer; none of them is reported to the caller.
///
/// Concurrent callers that miss on the same key each run their producer.
/// There is no single-flight coalescing.
#[derive(Debug, Clone)]
pub struct CacheService {
    store: StoreClient,
    config: CacheConfig,
}

impl CacheService {
    /// Create a cache service.
    pub fn new(store: StoreClient, config: CacheConfig) -> Self {
        debug!(backend = store.backend_name(), prefix = ?config.key_prefix, "Creating cache service");
        Self { store, config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Return the cached value for `key`, or run `producer` and cache its
    /// result for `ttl`.
    ///
    /// `producer` runs at most once per call.
    ///
    /// # Errors
    ///
    /// Only the producer's own error is returned.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        producer: F,
        ttl: Duration,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = self.config.build_key(key);
        let Some(store) = self.store.store() else {
            trace!(key = %key, "Cache bypassed, no shared store");
            return producer().await;
        };

        match helpers::get::<T>(store.as_ref(), &key).await {
            Ok(Some(value)) => {
                debug!(key = %key, "Cache hit");
                return Ok(value);
            }
            Ok(None) => {
                debug!(key = %key, "Cache miss");
            }
            Err(crate::CacheError::Store(e)) => {
                error!(key = %key, error = %e, "Cache read failed");
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding unreadable cache entry");
            }
        }

        let value = producer().await?;

        if let Err(e) = helpers::set(store.as_ref(), &key, &value, Some(ttl)).await {
            error!(key = %key, error = %e, "Cache write failed");
        }

        Ok(value)
    }

    /// [`get_or_compute`](Self::get_or_compute) with the configured default TTL.
    pub async fn get_or_compute_default<T, E, F, Fut>(&self, key: &str, producer: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.get_or_compute(key, producer, self.config.default_ttl)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rampart_store::{ManualClock, MemoryStore, SharedStore};
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn service() -> (CacheService, Arc<MemoryStore>, ManualClock) {
        let clock = ManualClock::new(1_700_000_000.0);
        let store = Arc::new(MemoryStore::with_clock(clock.shared()));
        let service = CacheService::new(StoreClient::from_store(store.clone()), CacheConfig::new());
        (service, store, clock)
    }

    #[tokio::test]
    async fn test_producer_called_once() {
        let (cache, _store, _clock) = service();
        let calls = AtomicU32::new(0);

        for _ in 0..2 {
            let value = cache
                .get_or_compute(
                    "k",
                    || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, Infallible>(vec![1, 2, 3])
                    },
                    Duration::from_secs(60),
                )
                .await
                .unwrap();
            assert_eq!(value, vec![1, 2, 3]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_entry_expires() {
        let (cache, _store, clock) = service();
        let calls = AtomicU32::new(0);
        let produce = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>("fresh".to_string())
        };

        cache
            .get_or_compute("k", produce, Duration::from_secs(10))
            .await
            .unwrap();
        clock.advance(Duration::from_secs(10));
        cache
            .get_or_compute("k", produce, Duration::from_secs(10))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_miss() {
        let (cache, store, _clock) = service();
        store.set("k", "not json", None).await.unwrap();

        let value: u32 = cache
            .get_or_compute("k", || async { Ok::<_, Infallible>(7) }, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(value, 7);

        // Overwritten with the fresh value
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn test_producer_error_propagates() {
        let (cache, store, _clock) = service();

        let result: Result<u32, &str> = cache
            .get_or_compute("k", || async { Err("downstream failed") }, Duration::from_secs(60))
            .await;
        assert_eq!(result, Err("downstream failed"));
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unserializable_value_is_returned_uncached() {
        let (cache, store, _clock) = service();
        let calls = AtomicU32::new(0);
        let produce = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            let mut grid = HashMap::new();
            grid.insert((1u8, 2u8), 3u8);
            Ok::<_, Infallible>(grid)
        };

        // JSON object keys must be strings, so the write fails
        let value = cache
            .get_or_compute("grid", produce, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(value.get(&(1, 2)), Some(&3));
        assert_eq!(store.get("grid").await.unwrap(), None);
        assert_eq!(store.key_count(), 0);

        cache
            .get_or_compute("grid", produce, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_default_ttl_and_prefix() {
        let clock = ManualClock::new(0.0);
        let store = Arc::new(MemoryStore::with_clock(clock.shared()));
        let cache = CacheService::new(
            StoreClient::from_store(store.clone()),
            CacheConfig::new()
                .with_prefix("app")
                .with_ttl(Duration::from_secs(120)),
        );

        cache
            .get_or_compute_default("k", || async { Ok::<_, Infallible>(true) })
            .await
            .unwrap();

        assert_eq!(store.get("app:k").await.unwrap().as_deref(), Some("true"));
        assert_eq!(
            store.ttl("app:k").await.unwrap(),
            Some(Duration::from_secs(120))
        );
    }
}
