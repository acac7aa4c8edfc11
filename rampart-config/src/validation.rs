// Configuration validation

use crate::{ConfigError, Result};

/// Trait for validating configuration
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Configuration validator with rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate that a value is not empty
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                field
            )));
        }
        Ok(())
    }

    /// Validate that a count or duration is greater than zero
    pub fn positive<T: PartialOrd + Default>(value: T, field: &str) -> Result<()> {
        if value <= T::default() {
            return Err(ConfigError::ValidationError(format!(
                "{} must be greater than 0",
                field
            )));
        }
        Ok(())
    }
}
