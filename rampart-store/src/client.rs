//! Process-wide store handle.

use crate::config::StoreConfig;
use crate::redis_store::RedisStore;
use crate::store::SharedStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Handle to the shared store, or the record that there is none.
///
/// Construct one at startup and pass it (cheaply cloned) to every component.
/// Construction never fails: when the store cannot be reached the handle is
/// *degraded* and components run on their local fallbacks. A degraded handle
/// never reconnects; restart the process to retry.
#[derive(Clone)]
pub struct StoreClient {
    store: Option<Arc<dyn SharedStore>>,
}

impl StoreClient {
    /// Connect to the configured Redis instance.
    ///
    /// Bounded by `config.connect_timeout`. On any failure the returned handle
    /// is degraded and a warning is logged.
    pub async fn connect(config: &StoreConfig) -> Self {
        match RedisStore::connect(config).await {
            Ok(store) => {
                info!(backend = "redis", "Shared store available");
                Self::from_store(Arc::new(store))
            }
            Err(e) => {
                warn!(
                    url = %config.redacted_url(),
                    error = %e,
                    "Shared store unavailable, running on local fallbacks"
                );
                Self::degraded()
            }
        }
    }

    /// Wrap an already constructed store.
    pub fn from_store(store: Arc<dyn SharedStore>) -> Self {
        Self { store: Some(store) }
    }

    /// A handle with no store behind it.
    pub fn degraded() -> Self {
        Self { store: None }
    }

    /// Whether a shared store was available at construction.
    pub fn is_available(&self) -> bool {
        self.store.is_some()
    }

    /// The underlying store, if any.
    pub fn store(&self) -> Option<&Arc<dyn SharedStore>> {
        self.store.as_ref()
    }

    /// Backend name for logging, `"none"` when degraded.
    pub fn backend_name(&self) -> &'static str {
        self.store
            .as_ref()
            .map(|store| store.backend_name())
            .unwrap_or("none")
    }
}

impl std::fmt::Debug for StoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreClient")
            .field("backend", &self.backend_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use std::time::Duration;

    #[tokio::test]
    async fn test_connect_failure_is_degraded() {
        let config = StoreConfig::builder()
            .host("127.0.0.1")
            .port(1)
            .connect_timeout(Duration::from_millis(200))
            .build();

        let client = StoreClient::connect(&config).await;
        assert!(!client.is_available());
        assert!(client.store().is_none());
        assert_eq!(client.backend_name(), "none");
    }

    #[test]
    fn test_from_store() {
        let client = StoreClient::from_store(Arc::new(MemoryStore::new()));
        assert!(client.is_available());
        assert_eq!(client.backend_name(), "memory");
        assert!(format!("{:?}", client).contains("memory"));
    }
}
