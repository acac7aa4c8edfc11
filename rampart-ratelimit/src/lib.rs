//! # Rampart Rate Limiting
//!
//! Distributed sliding window log rate limiting, coordinated through the
//! shared store with a process-local fallback.
//!
//! ## Features
//!
//! - **Sliding Window Log**: Every request timestamp is recorded; only those
//!   in the trailing window count toward the quota
//! - **Atomic Updates**: Prune, record, count and expire happen in a single
//!   MULTI/EXEC round trip, so concurrent callers never over-admit
//! - **Fail Open**: Store errors never reach the caller; the call is decided
//!   by the local window instead
//! - **Retry Hints**: Denials carry the time until the oldest entry leaves
//!   the window
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rampart_ratelimit::{RateDecision, RateLimitConfig, RateLimiter};
//! use rampart_store::{StoreClient, StoreConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = StoreClient::connect(&StoreConfig::default()).await;
//! let config = RateLimitConfig::builder()
//!     .sliding_window(100, Duration::from_secs(60))
//!     .build()?;
//! let limiter = RateLimiter::new(store, config);
//!
//! match limiter.check("203.0.113.7").await {
//!     RateDecision::Allowed { remaining } => println!("{} remaining", remaining),
//!     RateDecision::Denied { retry_after } => println!("retry after {:?}", retry_after),
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod sliding_window;

pub use config::{RateLimitConfig, RateLimitConfigBuilder};
pub use error::{RateLimitError, RateLimitResult};
pub use sliding_window::SlidingWindowLog;

use rampart_store::{SharedClock, StoreClient, WindowSnapshot, system_clock};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, error, trace, warn};

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// The request may proceed
    Allowed {
        /// Requests left in the current window
        remaining: u64,
    },
    /// The quota is exhausted
    Denied {
        /// Whole seconds until the oldest request leaves the window
        retry_after: Duration,
    },
}

impl RateDecision {
    /// Whether the request may proceed
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    /// Retry hint, if denied
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Denied { retry_after } => Some(*retry_after),
            Self::Allowed { .. } => None,
        }
    }

    fn from_snapshot(snapshot: WindowSnapshot, now: f64, max_requests: u64, window: Duration) -> Self {
        if snapshot.count <= max_requests {
            return Self::Allowed {
                remaining: max_requests - snapshot.count,
            };
        }

        let window_secs = window.as_secs_f64();
        let wait = match snapshot.oldest {
            Some(oldest) => (window_secs - (now - oldest)).max(0.0),
            None => window_secs,
        };

        Self::Denied {
            retry_after: Duration::from_secs(wait.ceil() as u64),
        }
    }
}

/// The rate limiter
///
/// Denied requests are recorded too, so a client that keeps hammering an
/// exhausted quota keeps its window full.
pub struct RateLimiter {
    store: StoreClient,
    clock: SharedClock,
    config: RateLimitConfig,
    local: SlidingWindowLog,
    instance: String,
    seq: AtomicU64,
}

impl RateLimiter {
    /// Create a rate limiter on the system clock
    pub fn new(store: StoreClient, config: RateLimitConfig) -> Self {
        Self::with_clock(store, config, system_clock())
    }

    /// Create a rate limiter on the given clock
    pub fn with_clock(store: StoreClient, config: RateLimitConfig, clock: SharedClock) -> Self {
        debug!(
            max_requests = config.max_requests,
            window = ?config.window,
            backend = store.backend_name(),
            "Creating new rate limiter"
        );
        Self {
            store,
            clock,
            config,
            local: SlidingWindowLog::new(),
            instance: uuid::Uuid::new_v4().to_string(),
            seq: AtomicU64::new(0),
        }
    }

    /// Check a request against an explicit quota
    ///
    /// Never fails. If the shared store is unavailable, or errors during
    /// this call, the decision comes from the process-local window.
    pub async fn allow(&self, client_key: &str, max_requests: u64, window: Duration) -> RateDecision {
        let now = self.clock.now();
        let cutoff = now - window.as_secs_f64();
        let key = self.config.store_key(client_key);

        trace!(key = %key, now = now, "Checking rate limit");

        let snapshot = match self.store.store() {
            Some(store) => {
                let member = self.member(now);
                match store.record_window(&key, &member, now, cutoff, window).await {
                    Ok(snapshot) => snapshot,
                    Err(e) => {
                        error!(key = %key, error = %e, "Rate limit store error, using local window");
                        self.local.record(&key, now, cutoff)
                    }
                }
            }
            None => self.local.record(&key, now, cutoff),
        };

        let decision = RateDecision::from_snapshot(snapshot, now, max_requests, window);
        match decision {
            RateDecision::Allowed { remaining } => {
                debug!(key = %key, remaining = remaining, "Sliding window: request allowed");
            }
            RateDecision::Denied { retry_after } => {
                warn!(key = %key, retry_after = retry_after.as_secs(), "Sliding window: request denied");
            }
        }
        decision
    }

    /// Check a request against the configured quota
    pub async fn check(&self, client_key: &str) -> RateDecision {
        self.allow(client_key, self.config.max_requests, self.config.window)
            .await
    }

    /// Run `next` only if the configured quota allows it
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::LimitExceeded`] without calling `next` when
    /// the request is denied.
    pub async fn guard<F, Fut, T>(&self, client_key: &str, next: F) -> RateLimitResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        match self.check(client_key).await {
            RateDecision::Allowed { .. } => Ok(next().await),
            RateDecision::Denied { retry_after } => Err(RateLimitError::limit_exceeded(
                self.config.max_requests,
                retry_after,
            )),
        }
    }

    /// Clear a client's window, shared and local
    pub async fn reset(&self, client_key: &str) {
        let key = self.config.store_key(client_key);
        debug!(key = %key, "Resetting rate limit");

        if let Some(store) = self.store.store()
            && let Err(e) = store.delete(&key).await
        {
            error!(key = %key, error = %e, "Failed to reset shared rate limit window");
        }
        self.local.reset(&key);
    }

    /// Get the configuration
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Unique sorted-set member for a request at `now`
    fn member(&self, now: f64) -> String {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        format!("{}:{}:{}", now, self.instance, seq)
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("instance", &self.instance)
            .finish()
    }
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::config::{RateLimitConfig, RateLimitConfigBuilder};
    pub use crate::error::{RateLimitError, RateLimitResult};
    pub use crate::{RateDecision, RateLimiter};
}
