//! Circuit state and its mirrored encoding.

use std::str::FromStr;
use thiserror::Error;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CircuitState {
    /// Circuit is closed, requests pass through normally.
    Closed,
    /// Circuit is open, requests are rejected.
    Open,
    /// Circuit is half-open, testing recovery.
    HalfOpen,
}

impl CircuitState {
    /// Value written to the shared store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "Closed"),
            Self::Open => write!(f, "Open"),
            Self::HalfOpen => write!(f, "HalfOpen"),
        }
    }
}

/// A mirrored value that is not a known state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown circuit state: {0:?}")]
pub struct UnknownState(pub String);

impl FromStr for CircuitState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "closed" => Ok(Self::Closed),
            "open" => Ok(Self::Open),
            "half_open" => Ok(Self::HalfOpen),
            other => Err(UnknownState(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_encoding() {
        for state in [CircuitState::Closed, CircuitState::Open, CircuitState::HalfOpen] {
            assert_eq!(state.as_str().parse::<CircuitState>(), Ok(state));
        }
        assert_eq!(CircuitState::HalfOpen.as_str(), "half_open");
        assert!("OPEN".parse::<CircuitState>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(CircuitState::HalfOpen.to_string(), "HalfOpen");
    }
}
