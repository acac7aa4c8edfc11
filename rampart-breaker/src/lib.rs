//! # Rampart Circuit Breaker
//!
//! The circuit breaker prevents cascade failures by monitoring for failures
//! and "opening" the circuit to reject requests when a failure threshold is
//! reached.
//!
//! ## States
//!
//! - **Closed**: Normal operation, requests pass through
//! - **Open**: Circuit is tripped, requests are rejected immediately
//! - **Half-Open**: Probation; the next calls decide between closing and
//!   re-opening
//!
//! Each transition is mirrored into the shared store so that other instances
//! stop calling a dependency one of them has already seen fail.
//!
//! ## Example
//!
//! ```rust,no_run
//! use rampart_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError};
//! use rampart_store::{StoreClient, StoreConfig};
//! use std::time::Duration;
//!
//! # async fn fetch() -> Result<String, std::io::Error> { Ok(String::new()) }
//! # async fn example() {
//! let store = StoreClient::connect(&StoreConfig::default()).await;
//! let circuit = CircuitBreaker::new(
//!     CircuitBreakerConfig::new("upstream")
//!         .failure_threshold(5)
//!         .reset_timeout(Duration::from_secs(60)),
//!     store,
//! );
//!
//! match circuit.call(|| fetch()).await {
//!     Ok(body) => println!("{}", body),
//!     Err(CircuitBreakerError::Open { retry_after }) => {
//!         println!("Service temporarily unavailable, retry in {:?}", retry_after)
//!     }
//!     Err(CircuitBreakerError::Execution(e)) => println!("upstream failed: {}", e),
//! }
//! # }
//! ```

mod breaker;
mod config;
mod error;
mod state;

pub use breaker::{CircuitBreaker, CircuitBreakerStats, GuardDecision};
pub use config::CircuitBreakerConfig;
pub use error::{CircuitBreakerError, ConfigError};
pub use state::{CircuitState, UnknownState};
