//! Guard composition for a protected handler.
//!
//! A call passes through three stages, in order: the rate limiter, the
//! circuit breaker, and the response cache. Each stage may short-circuit.
//! A cache hit still passes the breaker and counts as a success there.

use crate::payload::{
    ErrorPayload, STATUS_INTERNAL_ERROR, STATUS_SERVICE_UNAVAILABLE, STATUS_TOO_MANY_REQUESTS,
};
use rampart_breaker::{CircuitBreaker, CircuitBreakerError};
use rampart_cache::CacheService;
use rampart_config::ResilienceSettings;
use rampart_ratelimit::{RateLimitError, RateLimiter};
use rampart_store::{SharedClock, StoreClient, system_clock};
use serde::{Serialize, de::DeserializeOwned};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Why a pipeline call did not produce a value.
#[derive(Debug, Error)]
pub enum PipelineError<E> {
    /// The client is over its quota. The handler did not run.
    #[error("Rate limit exceeded")]
    RateLimited {
        /// Time until the oldest request in the window expires.
        retry_after: Duration,
    },

    /// The circuit is open. The handler did not run.
    #[error("Service temporarily unavailable")]
    CircuitOpen {
        /// Time left before the breaker admits a trial call.
        retry_after: Duration,
    },

    /// The rate limiter rejected its own quota. The handler did not run.
    #[error("Service misconfigured: {0}")]
    Misconfigured(String),

    /// The handler ran and failed.
    #[error("{0}")]
    Operation(E),
}

impl<E> PipelineError<E> {
    /// Rejection body for the client. `None` for operation failures.
    pub fn payload(&self) -> Option<ErrorPayload> {
        match self {
            Self::RateLimited { retry_after } => Some(ErrorPayload::rate_limited(*retry_after)),
            Self::CircuitOpen { retry_after } => {
                Some(ErrorPayload::service_unavailable(*retry_after))
            }
            Self::Misconfigured(details) => {
                Some(ErrorPayload::failed("Service misconfigured", details.clone()))
            }
            Self::Operation(_) => None,
        }
    }

    /// HTTP status for a rejection. `None` for operation failures.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(STATUS_TOO_MANY_REQUESTS),
            Self::CircuitOpen { .. } => Some(STATUS_SERVICE_UNAVAILABLE),
            Self::Misconfigured(_) => Some(STATUS_INTERNAL_ERROR),
            Self::Operation(_) => None,
        }
    }

    /// Retry hint for a rejection.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } | Self::CircuitOpen { retry_after } => {
                Some(*retry_after)
            }
            Self::Misconfigured(_) | Self::Operation(_) => None,
        }
    }

    /// The handler's own error, if it ran and failed.
    pub fn into_operation(self) -> Option<E> {
        match self {
            Self::Operation(e) => Some(e),
            _ => None,
        }
    }
}

/// Rate limiter, circuit breaker and cache sharing one store.
#[derive(Debug, Clone)]
pub struct Pipeline {
    limiter: Arc<RateLimiter>,
    breaker: Arc<CircuitBreaker>,
    cache: CacheService,
}

impl Pipeline {
    /// Assemble a pipeline from existing stages.
    pub fn new(limiter: Arc<RateLimiter>, breaker: Arc<CircuitBreaker>, cache: CacheService) -> Self {
        Self {
            limiter,
            breaker,
            cache,
        }
    }

    /// Connect to the configured store and build every stage.
    ///
    /// Never fails. An unreachable store leaves every stage in local mode.
    pub async fn connect(settings: &ResilienceSettings) -> Self {
        let store = StoreClient::connect(&settings.store).await;
        Self::from_settings(store, settings)
    }

    /// Build every stage over `store` on the system clock.
    pub fn from_settings(store: StoreClient, settings: &ResilienceSettings) -> Self {
        Self::with_clock(store, settings, system_clock())
    }

    /// Build every stage over `store` on the given clock.
    pub fn with_clock(store: StoreClient, settings: &ResilienceSettings, clock: SharedClock) -> Self {
        info!(backend = store.backend_name(), "Building resilience pipeline");

        let limiter = RateLimiter::with_clock(store.clone(), settings.rate_limit_config(), clock.clone());
        let breaker = CircuitBreaker::with_clock(settings.circuit_breaker_config(), store.clone(), clock);
        let cache = CacheService::new(store, settings.cache_config());

        Self::new(Arc::new(limiter), Arc::new(breaker), cache)
    }

    /// The rate limiting stage.
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// The circuit breaker stage.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// The response cache stage.
    pub fn cache(&self) -> &CacheService {
        &self.cache
    }

    /// Run `producer` behind every stage.
    ///
    /// The result is cached under `cache_key` for `ttl`. `producer` runs at
    /// most once, and not at all when a stage rejects or the cache hits.
    pub async fn execute<T, E, F, Fut>(
        &self,
        client_key: &str,
        cache_key: &str,
        ttl: Duration,
        producer: F,
    ) -> Result<T, PipelineError<E>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let outcome = self
            .limiter
            .guard(client_key, || async move {
                self.breaker
                    .call(move || self.cache.get_or_compute(cache_key, producer, ttl))
                    .await
            })
            .await;

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(CircuitBreakerError::Open { retry_after })) => {
                debug!(client = client_key, breaker = self.breaker.name(), "Rejected by circuit breaker");
                Err(PipelineError::CircuitOpen { retry_after })
            }
            Ok(Err(CircuitBreakerError::Execution(e))) => Err(PipelineError::Operation(e)),
            Err(e) => {
                debug!(client = client_key, error = %e, "Rejected by rate limiter");
                Err(e.into())
            }
        }
    }
}

impl<E> From<RateLimitError> for PipelineError<E> {
    fn from(err: RateLimitError) -> Self {
        match err {
            RateLimitError::LimitExceeded { retry_after, .. } => Self::RateLimited { retry_after },
            RateLimitError::ConfigError(msg) => Self::Misconfigured(msg),
        }
    }
}
