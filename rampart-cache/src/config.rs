//! Cache configuration types.

use std::time::Duration;

/// Cache configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Key prefix for all cache keys
    pub key_prefix: Option<String>,

    /// TTL used by `get_or_compute_default`
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: None,
            default_ttl: Duration::from_secs(3600),
        }
    }
}

impl CacheConfig {
    /// Create a configuration with defaults (no prefix, one hour TTL).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the key prefix.
    ///
    /// # Examples
    ///
    /// ```
    /// use rampart_cache::CacheConfig;
    /// use std::time::Duration;
    ///
    /// let config = CacheConfig::new()
    ///     .with_prefix("myapp")
    ///     .with_ttl(Duration::from_secs(7200));
    ///
    /// assert_eq!(config.build_key("user:1"), "myapp:user:1");
    /// ```
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Set the default TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Build a full key with prefix.
    pub fn build_key(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }
}
