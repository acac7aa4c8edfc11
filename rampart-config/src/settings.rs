// Resilience settings sections

use crate::env::EnvLoader;
use crate::validation::{ConfigValidator, Validate};
use crate::Result;
use rampart_breaker::CircuitBreakerConfig;
use rampart_cache::CacheConfig;
use rampart_ratelimit::RateLimitConfig;
use rampart_store::StoreConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Rate limiter settings. Durations are whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub max_requests: u64,
    pub window_seconds: u64,
    pub key_prefix: String,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        let config = RateLimitConfig::deployment_default();
        Self {
            max_requests: config.max_requests,
            window_seconds: config.window.as_secs(),
            key_prefix: config.key_prefix,
        }
    }
}

impl RateLimitSettings {
    pub fn to_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.max_requests,
            window: Duration::from_secs(self.window_seconds),
            key_prefix: self.key_prefix.clone(),
        }
    }
}

impl Validate for RateLimitSettings {
    fn validate(&self) -> Result<()> {
        ConfigValidator::positive(self.max_requests, "rate_limit.max_requests")?;
        ConfigValidator::positive(self.window_seconds, "rate_limit.window_seconds")?;
        ConfigValidator::not_empty(&self.key_prefix, "rate_limit.key_prefix")
    }
}

/// Circuit breaker settings. Durations are whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub name: String,
    pub failure_threshold: u32,
    pub reset_timeout: u64,
    pub half_open_timeout: u64,
    pub state_key: String,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        let config = CircuitBreakerConfig::default();
        Self {
            name: config.name,
            failure_threshold: config.failure_threshold,
            reset_timeout: config.reset_timeout.as_secs(),
            half_open_timeout: config.half_open_timeout.as_secs(),
            state_key: config.state_key,
        }
    }
}

impl CircuitBreakerSettings {
    pub fn to_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig::new(self.name.clone())
            .failure_threshold(self.failure_threshold)
            .reset_timeout(Duration::from_secs(self.reset_timeout))
            .half_open_timeout(Duration::from_secs(self.half_open_timeout))
            .state_key(self.state_key.clone())
    }
}

impl Validate for CircuitBreakerSettings {
    fn validate(&self) -> Result<()> {
        ConfigValidator::positive(self.failure_threshold, "circuit_breaker.failure_threshold")?;
        ConfigValidator::positive(self.reset_timeout, "circuit_breaker.reset_timeout")?;
        ConfigValidator::positive(self.half_open_timeout, "circuit_breaker.half_open_timeout")?;
        ConfigValidator::not_empty(&self.state_key, "circuit_breaker.state_key")
    }
}

/// Cache settings. Durations are whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_seconds: u64,
    pub key_prefix: Option<String>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        let config = CacheConfig::default();
        Self {
            ttl_seconds: config.default_ttl.as_secs(),
            key_prefix: config.key_prefix,
        }
    }
}

impl CacheSettings {
    pub fn to_config(&self) -> CacheConfig {
        let config = CacheConfig::new().with_ttl(Duration::from_secs(self.ttl_seconds));
        match &self.key_prefix {
            Some(prefix) => config.with_prefix(prefix.clone()),
            None => config,
        }
    }
}

impl Validate for CacheSettings {
    fn validate(&self) -> Result<()> {
        ConfigValidator::positive(self.ttl_seconds, "cache.ttl_seconds")
    }
}

/// Everything the resilience layer reads at startup.
///
/// ```toml
/// [store]
/// host = "localhost"
/// port = 6379
/// connect_timeout = 2
///
/// [rate_limit]
/// max_requests = 100
/// window_seconds = 900
///
/// [circuit_breaker]
/// failure_threshold = 5
/// reset_timeout = 60
/// half_open_timeout = 30
///
/// [cache]
/// ttl_seconds = 3600
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceSettings {
    pub store: StoreConfig,
    pub rate_limit: RateLimitSettings,
    pub circuit_breaker: CircuitBreakerSettings,
    pub cache: CacheSettings,
}

impl ResilienceSettings {
    /// Apply `RAMPART_*` (and `REDIS_URL`) overrides.
    ///
    /// Loader keys are looked up with the loader's prefix, so a loader
    /// created with `Some("RAMPART")` reads `RAMPART_REDIS_HOST` and so on.
    pub fn apply_env(&mut self, env: &EnvLoader) -> Result<()> {
        if let Some(url) = env.load_raw("REDIS_URL") {
            self.store.url = Some(url);
        }
        if let Some(host) = env.load_var("redis_host") {
            self.store.host = host;
        }
        if let Some(port) = env.parse_var("redis_port")? {
            self.store.port = port;
        }
        if let Some(db) = env.parse_var("redis_db")? {
            self.store.database = db;
        }
        if let Some(username) = env.load_var("redis_username") {
            self.store.username = Some(username);
        }
        if let Some(password) = env.load_var("redis_password") {
            self.store.password = Some(password);
        }
        if let Some(secs) = env.parse_var("redis_connect_timeout")? {
            self.store.connect_timeout = Duration::from_secs(secs);
        }

        if let Some(max) = env.parse_var("rate_limit_max_requests")? {
            self.rate_limit.max_requests = max;
        }
        if let Some(window) = env.parse_var("rate_limit_window")? {
            self.rate_limit.window_seconds = window;
        }

        if let Some(threshold) = env.parse_var("circuit_failure_threshold")? {
            self.circuit_breaker.failure_threshold = threshold;
        }
        if let Some(timeout) = env.parse_var("circuit_reset_timeout")? {
            self.circuit_breaker.reset_timeout = timeout;
        }
        if let Some(timeout) = env.parse_var("circuit_half_open_timeout")? {
            self.circuit_breaker.half_open_timeout = timeout;
        }

        if let Some(ttl) = env.parse_var("cache_ttl")? {
            self.cache.ttl_seconds = ttl;
        }

        Ok(())
    }

    pub fn store_config(&self) -> StoreConfig {
        self.store.clone()
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        self.rate_limit.to_config()
    }

    pub fn circuit_breaker_config(&self) -> CircuitBreakerConfig {
        self.circuit_breaker.to_config()
    }

    pub fn cache_config(&self) -> CacheConfig {
        self.cache.to_config()
    }
}

impl Validate for ResilienceSettings {
    fn validate(&self) -> Result<()> {
        ConfigValidator::not_empty(&self.store.host, "store.host")?;
        ConfigValidator::positive(self.store.connect_timeout, "store.connect_timeout")?;
        ConfigValidator::positive(self.store.command_timeout, "store.command_timeout")?;
        self.rate_limit.validate()?;
        self.circuit_breaker.validate()?;
        self.cache.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_deployment() {
        let settings = ResilienceSettings::default();
        assert_eq!(settings.store.host, "localhost");
        assert_eq!(settings.store.port, 6379);
        assert_eq!(settings.rate_limit.max_requests, 100);
        assert_eq!(settings.rate_limit.window_seconds, 900);
        assert_eq!(settings.circuit_breaker.failure_threshold, 5);
        assert_eq!(settings.circuit_breaker.reset_timeout, 60);
        assert_eq!(settings.cache.ttl_seconds, 3600);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_converters() {
        let settings = ResilienceSettings {
            cache: CacheSettings {
                ttl_seconds: 10,
                key_prefix: Some("app".into()),
            },
            ..Default::default()
        };

        assert_eq!(settings.rate_limit_config().window, Duration::from_secs(900));
        assert_eq!(
            settings.circuit_breaker_config().half_open_timeout,
            Duration::from_secs(30)
        );
        let cache = settings.cache_config();
        assert_eq!(cache.default_ttl, Duration::from_secs(10));
        assert_eq!(cache.build_key("k"), "app:k");
    }

    #[test]
    fn test_validate_rejects_zero() {
        let mut settings = ResilienceSettings::default();
        settings.rate_limit.max_requests = 0;
        assert!(settings.validate().is_err());

        let mut settings = ResilienceSettings::default();
        settings.circuit_breaker.reset_timeout = 0;
        assert!(settings.validate().is_err());

        let mut settings = ResilienceSettings::default();
        settings.store.connect_timeout = Duration::ZERO;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_apply_env() {
        let env = EnvLoader::from_vars(
            Some("RAMPART".to_string()),
            [
                ("RAMPART_REDIS_HOST", "redis.internal"),
                ("RAMPART_REDIS_PORT", "6380"),
                ("RAMPART_RATE_LIMIT_MAX_REQUESTS", "3"),
                ("RAMPART_RATE_LIMIT_WINDOW", "60"),
                ("RAMPART_CIRCUIT_FAILURE_THRESHOLD", "2"),
                ("RAMPART_CACHE_TTL", "120"),
            ],
        );

        let mut settings = ResilienceSettings::default();
        settings.apply_env(&env).unwrap();

        assert_eq!(settings.store.host, "redis.internal");
        assert_eq!(settings.store.port, 6380);
        assert_eq!(settings.rate_limit.max_requests, 3);
        assert_eq!(settings.rate_limit.window_seconds, 60);
        assert_eq!(settings.circuit_breaker.failure_threshold, 2);
        assert_eq!(settings.circuit_breaker.reset_timeout, 60);
        assert_eq!(settings.cache.ttl_seconds, 120);
    }

    #[test]
    fn test_apply_env_invalid_number() {
        let env = EnvLoader::from_vars(
            Some("RAMPART".to_string()),
            [("RAMPART_CIRCUIT_RESET_TIMEOUT", "soon")],
        );

        let mut settings = ResilienceSettings::default();
        assert!(settings.apply_env(&env).is_err());
    }
}
