// Rampart - distributed request protection for Rust services
//
// This library wraps a request handler in a per-client rate limiter, a
// circuit breaker and a response cache, all coordinated through one shared
// key-value store.

pub mod logging;
pub mod payload;
pub mod pipeline;
pub mod translation;

pub use payload::ErrorPayload;
pub use pipeline::{Pipeline, PipelineError};
pub use translation::{
    EchoTranslator, TranslationError, TranslationRequest, TranslationResponse, TranslationService,
    Translator,
};

// Re-export component crates
pub use rampart_breaker;
pub use rampart_cache;
pub use rampart_config;
pub use rampart_ratelimit;
pub use rampart_store;

/// Prelude for common imports.
///
/// ```
/// use rampart::prelude::*;
/// ```
pub mod prelude {
    pub use crate::payload::ErrorPayload;
    pub use crate::pipeline::{Pipeline, PipelineError};
    pub use crate::translation::{
        EchoTranslator, TranslationError, TranslationRequest, TranslationResponse,
        TranslationService, Translator,
    };
    pub use rampart_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState};
    pub use rampart_cache::{CacheConfig, CacheService};
    pub use rampart_config::ResilienceSettings;
    pub use rampart_ratelimit::{RateDecision, RateLimitConfig, RateLimitError, RateLimiter};
    pub use rampart_store::{StoreClient, StoreConfig};
}
