//! # Rampart Store
//!
//! Shared key-value / sorted-set store used by the Rampart resilience
//! components to coordinate across instances.
//!
//! ## Features
//!
//! - **Redis backend**: Atomic MULTI/EXEC sliding-window updates over a
//!   self-reconnecting connection manager
//! - **In-process backend**: Same contract in memory, driven by an injectable
//!   clock for deterministic tests
//! - **Degraded mode**: A [`StoreClient`] that could not connect still hands
//!   out a usable handle; components fall back to local state
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rampart_store::{StoreClient, StoreConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = StoreConfig::from_env().build();
//!
//!     // Never fails; check `is_available()` if you care
//!     let client = StoreClient::connect(&config).await;
//!
//!     if let Some(store) = client.store() {
//!         store.set("greeting", "hello", None).await.ok();
//!     }
//! }
//! ```

mod client;
mod clock;
mod config;
mod error;
mod memory;
mod redis_store;
mod store;

pub use client::StoreClient;
pub use clock::{Clock, ManualClock, SharedClock, SystemClock, system_clock};
pub use config::{StoreConfig, StoreConfigBuilder};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use store::{SharedStore, WindowSnapshot};

#[doc(hidden)]
pub mod serde_helpers {
    //! Duration-as-seconds serde adapter shared with the other Rampart crates.
    pub use crate::config::duration_secs;
}

/// Prelude for common imports.
///
/// ```
/// use rampart_store::prelude::*;
/// ```
pub mod prelude {
    pub use crate::client::StoreClient;
    pub use crate::clock::{Clock, SharedClock, system_clock};
    pub use crate::config::{StoreConfig, StoreConfigBuilder};
    pub use crate::error::{StoreError, StoreResult};
    pub use crate::store::{SharedStore, WindowSnapshot};
}
