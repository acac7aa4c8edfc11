//! Shared store configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Shared store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store host.
    pub host: String,
    /// Store port.
    pub port: u16,
    /// Database number (0-15).
    pub database: u8,
    /// Username for Redis 6+ ACL.
    pub username: Option<String>,
    /// Password.
    pub password: Option<String>,
    /// Full connection URL; takes precedence over host/port/database.
    pub url: Option<String>,
    /// Connection timeout, enforced when the client is constructed.
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,
    /// Per-command timeout.
    #[serde(with = "duration_secs")]
    pub command_timeout: Duration,
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(2)
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            database: 0,
            username: None,
            password: None,
            url: None,
            connect_timeout: default_connect_timeout(),
            command_timeout: default_command_timeout(),
        }
    }
}

impl StoreConfig {
    /// Create a configuration pointing at `host:port`.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Create a builder.
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::new()
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> StoreConfigBuilder {
        let mut builder = StoreConfigBuilder::new();

        if let Ok(url) = std::env::var("REDIS_URL") {
            builder = builder.url(url);
        }

        if let Ok(host) = std::env::var("RAMPART_REDIS_HOST") {
            builder = builder.host(host);
        }

        if let Ok(port) = std::env::var("RAMPART_REDIS_PORT")
            && let Ok(port) = port.parse()
        {
            builder = builder.port(port);
        }

        if let Ok(db) = std::env::var("RAMPART_REDIS_DB")
            && let Ok(db) = db.parse()
        {
            builder = builder.database(db);
        }

        if let Ok(username) = std::env::var("RAMPART_REDIS_USERNAME") {
            builder = builder.username(username);
        }

        if let Ok(password) = std::env::var("RAMPART_REDIS_PASSWORD") {
            builder = builder.password(password);
        }

        builder
    }

    /// Get the full Redis URL with auth and database.
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }

        let auth = match (&self.username, &self.password) {
            (Some(username), Some(password)) => format!("{}:{}@", username, password),
            (None, Some(password)) => format!(":{}@", password),
            _ => String::new(),
        };

        format!(
            "redis://{}{}:{}/{}",
            auth, self.host, self.port, self.database
        )
    }

    /// Connection URL safe to log (credentials masked).
    pub fn redacted_url(&self) -> String {
        if self.url.is_some() {
            return "<url>".to_string();
        }
        format!("redis://{}:{}/{}", self.host, self.port, self.database)
    }
}

/// Builder for store configuration.
#[derive(Default)]
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: StoreConfig::default(),
        }
    }

    /// Set the host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the database number.
    pub fn database(mut self, db: u8) -> Self {
        self.config.database = db;
        self
    }

    /// Set the username (Redis 6+ ACL).
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = Some(username.into());
        self
    }

    /// Set the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = Some(password.into());
        self
    }

    /// Set a full connection URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = Some(url.into());
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the command timeout.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.config.command_timeout = timeout;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> StoreConfig {
        self.config
    }
}

pub mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 6379);
        assert_eq!(config.database, 0);
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.connection_url(), "redis://localhost:6379/0");
    }

    #[test]
    fn test_connection_url_with_auth() {
        let config = StoreConfig::builder()
            .host("cache.internal")
            .port(6380)
            .database(2)
            .password("secret")
            .build();
        assert_eq!(config.connection_url(), "redis://:secret@cache.internal:6380/2");

        let config = StoreConfig::builder().username("svc").password("pw").build();
        assert_eq!(config.connection_url(), "redis://svc:pw@localhost:6379/0");
        assert!(!config.redacted_url().contains("pw"));
    }

    #[test]
    fn test_url_override() {
        let config = StoreConfig::builder()
            .url("redis://other:1234/5")
            .host("ignored")
            .build();
        assert_eq!(config.connection_url(), "redis://other:1234/5");
    }

    #[test]
    fn test_deserialize_seconds() {
        let config: StoreConfig =
            serde_json::from_str(r#"{"host":"redis","connect_timeout":5}"#).unwrap();
        assert_eq!(config.host, "redis");
        assert_eq!(config.port, 6379);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.command_timeout, Duration::from_secs(2));
    }
}
