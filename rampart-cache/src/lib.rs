//! Cache-aside memoization for Rampart.
//!
//! Wraps a producer with get-or-compute semantics against the shared store.
//! Values are stored as JSON, so anything `Serialize + DeserializeOwned` can
//! be cached.
//!
//! # Examples
//!
//! ```no_run
//! use rampart_cache::{CacheConfig, CacheService};
//! use rampart_store::{StoreClient, StoreConfig};
//! use std::time::Duration;
//!
//! # async fn lookup(id: u64) -> Result<String, std::io::Error> { Ok(id.to_string()) }
//! #[tokio::main]
//! async fn main() -> Result<(), std::io::Error> {
//!     let store = StoreClient::connect(&StoreConfig::default()).await;
//!     let cache = CacheService::new(store, CacheConfig::new().with_prefix("users"));
//!
//!     let name: String = cache
//!         .get_or_compute("42", || lookup(42), Duration::from_secs(60))
//!         .await?;
//!     println!("{}", name);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod helpers;
mod service;

pub use config::CacheConfig;
pub use error::{CacheError, CacheResult};
pub use service::CacheService;
