// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;
use std::str::FromStr;

/// Environment variable loader
///
/// Reads `{PREFIX}_{KEY}` from the process environment, or from a fixed
/// snapshot when built with [`EnvLoader::from_vars`].
#[derive(Debug, Clone)]
pub struct EnvLoader {
    prefix: Option<String>,
    vars: Option<HashMap<String, String>>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix, vars: None }
    }

    /// Create a loader over a fixed set of variables instead of the
    /// process environment
    pub fn from_vars<K, V>(prefix: Option<String>, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            prefix,
            vars: Some(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Load a variable by its full name, ignoring the prefix
    pub fn load_raw(&self, name: &str) -> Option<String> {
        match &self.vars {
            Some(vars) => vars.get(name).cloned(),
            None => env::var(name).ok(),
        }
    }

    /// Full variable name for a key
    pub fn full_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }

    /// Load a specific environment variable
    pub fn load_var(&self, key: &str) -> Option<String> {
        self.load_raw(&self.full_key(key))
    }

    /// Load and parse a variable. A present but unparsable value is an error.
    pub fn parse_var<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.load_var(key) {
            Some(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::InvalidValue {
                    key: self.full_key(key),
                    value,
                }),
            None => Ok(None),
        }
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_loader_missing_var() {
        let loader = EnvLoader::new(Some("RAMPART_TEST".to_string()));
        assert!(loader.load_var("MISSING_VAR_67890").is_none());
    }

    #[test]
    fn test_snapshot_with_prefix() {
        let loader = EnvLoader::from_vars(
            Some("RAMPART".to_string()),
            [("RAMPART_CACHE_TTL", "60"), ("REDIS_URL", "redis://r:6379/1")],
        );

        assert_eq!(loader.full_key("cache_ttl"), "RAMPART_CACHE_TTL");
        assert_eq!(loader.parse_var::<u64>("cache_ttl").unwrap(), Some(60));
        assert_eq!(loader.load_raw("REDIS_URL").as_deref(), Some("redis://r:6379/1"));
        assert_eq!(loader.parse_var::<u64>("missing").unwrap(), None);
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        let loader = EnvLoader::from_vars(Some("RAMPART".to_string()), [("RAMPART_REDIS_PORT", "http")]);

        let err = loader.parse_var::<u16>("redis_port").unwrap_err();
        assert!(err.to_string().contains("RAMPART_REDIS_PORT"));
    }
}
