// Configuration loading for Rampart
//
// Settings come from, in increasing precedence: built-in defaults, a TOML
// file, a `.env` file, and `RAMPART_*` environment variables.

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use settings::{CacheSettings, CircuitBreakerSettings, RateLimitSettings, ResilienceSettings};
pub use validation::{ConfigValidator, Validate};

use std::path::Path;
use tracing::{debug, info};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "RAMPART";

impl ResilienceSettings {
    /// Parse settings from TOML text. Missing sections take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        loader::parse_toml(content)
    }

    /// Read settings from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        loader::load_toml_file(path)
    }

    /// Load settings the way a service does at startup.
    ///
    /// Loads `.env` (if present), then the TOML file at `path` (if given),
    /// then applies `RAMPART_*` overrides from the environment, then
    /// validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        loader::load_dotenv(None)?;

        let mut settings = match path {
            Some(path) => {
                debug!(path = %path.display(), "Loading settings file");
                Self::from_file(path)?
            }
            None => Self::default(),
        };

        settings.apply_env(&EnvLoader::new(Some(ENV_PREFIX.to_string())))?;
        settings.validate()?;

        info!(
            store = %settings.store.redacted_url(),
            max_requests = settings.rate_limit.max_requests,
            window_seconds = settings.rate_limit.window_seconds,
            failure_threshold = settings.circuit_breaker.failure_threshold,
            "Resilience settings loaded"
        );
        Ok(settings)
    }
}
