// Configuration file loaders

use crate::{ConfigError, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Parse TOML text into a settings type
pub fn parse_toml<T: DeserializeOwned>(content: &str) -> Result<T> {
    toml::from_str(content).map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))
}

/// Load a TOML file into a settings type
pub fn load_toml_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        ConfigError::LoadError(format!("Failed to read {}: {}", path.display(), e))
    })?;

    parse_toml(&content)
}

/// Load a `.env` file into the process environment.
///
/// Without a path, a missing `.env` in the working directory is not an error.
pub fn load_dotenv(path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Sample {
        name: String,
        port: u16,
    }

    #[test]
    fn test_parse_toml() {
        let sample: Sample = parse_toml("name = \"store\"\nport = 6379\n").unwrap();
        assert_eq!(sample.name, "store");
        assert_eq!(sample.port, 6379);
    }

    #[test]
    fn test_parse_toml_error() {
        let result: Result<Sample> = parse_toml("name = ");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_missing_file() {
        let result: Result<Sample> = load_toml_file("/nonexistent/rampart.toml");
        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }
}
