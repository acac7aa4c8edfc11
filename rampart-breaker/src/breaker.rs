//! Circuit breaker state machine.

use crate::config::CircuitBreakerConfig;
use crate::error::CircuitBreakerError;
use crate::state::CircuitState;
use rampart_store::{SharedClock, StoreClient, system_clock};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, trace, warn};

/// Admission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// The protected operation may run.
    PermitGranted,
    /// The circuit is open.
    Rejected {
        /// Time until the circuit will admit a probe, in whole seconds.
        retry_after: Duration,
    },
}

impl GuardDecision {
    /// Whether the operation may run.
    pub fn is_permitted(&self) -> bool {
        matches!(self, Self::PermitGranted)
    }
}

/// How long mirror reads are skipped after one fails.
const MIRROR_READ_BACKOFF: Duration = Duration::from_secs(5);

/// Local state, the source of truth for this process.
#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failures: u32,
    /// When the circuit last opened (the tripping failure's time).
    opened_at: Option<f64>,
    /// When probation began.
    half_open_at: Option<f64>,
    /// No mirror reads before this instant.
    read_backoff_until: f64,
}

impl BreakerState {
    fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            failures: 0,
            opened_at: None,
            half_open_at: None,
            read_backoff_until: 0.0,
        }
    }
}

/// Circuit breaker for protecting a downstream operation.
///
/// All transitions are evaluated lazily when a call arrives. Every
/// transition is written to the shared store under
/// [`CircuitBreakerConfig::state_key`] so peers can see it; while this
/// breaker is closed it adopts an `open` written by a peer. Store failures
/// only ever cost that visibility.
///
/// The lock covers the local check-then-act only. Mirror reads happen
/// before it is taken and mirror writes after it is released, so a slow
/// store delays each call by at most one command timeout and never
/// serializes callers. After a failed read, reads are skipped for a few
/// seconds. The lock is also released while the protected operation runs.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    store: StoreClient,
    clock: SharedClock,
    inner: Mutex<BreakerState>,
    total_requests: AtomicU64,
    total_failures: AtomicU64,
    total_successes: AtomicU64,
    total_rejections: AtomicU64,
}

impl CircuitBreaker {
    /// Create a new circuit breaker on the system clock.
    pub fn new(config: CircuitBreakerConfig, store: StoreClient) -> Self {
        Self::with_clock(config, store, system_clock())
    }

    /// Create a new circuit breaker on the given clock.
    pub fn with_clock(config: CircuitBreakerConfig, store: StoreClient, clock: SharedClock) -> Self {
        info!(
            name = %config.name,
            failure_threshold = config.failure_threshold,
            reset_timeout = ?config.reset_timeout,
            half_open_timeout = ?config.half_open_timeout,
            backend = store.backend_name(),
            "Circuit breaker initialized"
        );

        Self {
            config,
            store,
            clock,
            inner: Mutex::new(BreakerState::closed()),
            total_requests: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
            total_successes: AtomicU64::new(0),
            total_rejections: AtomicU64::new(0),
        }
    }

    /// Get the circuit breaker name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Get the configuration.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Get the current local state.
    ///
    /// Pending lazy transitions are not applied; the next [`guard`](Self::guard)
    /// does that.
    pub async fn state(&self) -> CircuitState {
        self.inner.lock().await.state
    }

    /// Get the current consecutive failure count.
    pub async fn failure_count(&self) -> u32 {
        self.inner.lock().await.failures
    }

    /// Decide whether a call may proceed, applying any due transitions.
    pub async fn guard(&self) -> GuardDecision {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        let peer_open = self.read_mirror().await;

        let (decision, changed) = {
            let mut inner = self.inner.lock().await;
            if let Some(remaining) = peer_open {
                self.adopt_peer_open(&mut inner, remaining);
            }

            let now = self.clock.now();
            let (decision, changed) = match inner.state {
                CircuitState::Closed => (GuardDecision::PermitGranted, None),
                CircuitState::Open => {
                    let opened_at = inner.opened_at.unwrap_or(now);
                    let elapsed = now - opened_at;
                    let reset_timeout = self.config.reset_timeout.as_secs_f64();

                    if elapsed < reset_timeout {
                        let retry_after = whole_secs(reset_timeout - elapsed);
                        (GuardDecision::Rejected { retry_after }, None)
                    } else {
                        self.transition(&mut inner, CircuitState::HalfOpen, now);
                        (GuardDecision::PermitGranted, Some(CircuitState::HalfOpen))
                    }
                }
                CircuitState::HalfOpen => {
                    let entered = inner.half_open_at.unwrap_or(now);
                    if now - entered >= self.config.half_open_timeout.as_secs_f64() {
                        self.transition(&mut inner, CircuitState::Closed, now);
                        (GuardDecision::PermitGranted, Some(CircuitState::Closed))
                    } else {
                        (GuardDecision::PermitGranted, None)
                    }
                }
            };

            if let GuardDecision::Rejected { retry_after } = decision {
                self.total_rejections.fetch_add(1, Ordering::Relaxed);
                debug!(
                    name = %self.config.name,
                    state = %inner.state,
                    retry_after = retry_after.as_secs(),
                    "Circuit breaker rejected request"
                );
            }
            (decision, changed)
        };

        if let Some(state) = changed {
            self.mirror(state).await;
        }
        decision
    }

    /// Execute a function with circuit breaker protection.
    ///
    /// A rejected call never runs `f` and never counts as a failure. A
    /// failing `f` is counted and its error returned unchanged inside
    /// [`CircuitBreakerError::Execution`].
    pub async fn call<F, Fut, T, E>(&self, f: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let GuardDecision::Rejected { retry_after } = self.guard().await {
            return Err(CircuitBreakerError::Open { retry_after });
        }

        match f().await {
            Ok(result) => {
                self.total_successes.fetch_add(1, Ordering::Relaxed);
                self.reset().await;
                Ok(result)
            }
            Err(e) => {
                self.record_failure().await;
                Err(CircuitBreakerError::Execution(e))
            }
        }
    }

    /// Record a failed operation.
    ///
    /// A failure reported while the circuit is already open (a call admitted
    /// before a concurrent one tripped it) is counted in the totals only.
    pub async fn record_failure(&self) {
        self.total_failures.fetch_add(1, Ordering::Relaxed);

        let opened = {
            let mut inner = self.inner.lock().await;
            let now = self.clock.now();

            match inner.state {
                CircuitState::Closed => {
                    inner.failures = inner.failures.saturating_add(1);
                    trace!(
                        name = %self.config.name,
                        failures = inner.failures,
                        "Circuit breaker recorded failure"
                    );
                    if inner.failures >= self.config.failure_threshold {
                        self.transition(&mut inner, CircuitState::Open, now);
                        true
                    } else {
                        false
                    }
                }
                CircuitState::HalfOpen => {
                    // Probation failed
                    inner.failures = inner.failures.saturating_add(1);
                    self.transition(&mut inner, CircuitState::Open, now);
                    true
                }
                CircuitState::Open => false,
            }
        };

        if opened {
            self.mirror(CircuitState::Open).await;
        }
    }

    /// Reset the circuit breaker to closed state.
    pub async fn reset(&self) {
        let closed = {
            let mut inner = self.inner.lock().await;
            inner.failures = 0;
            if inner.state != CircuitState::Closed {
                let now = self.clock.now();
                self.transition(&mut inner, CircuitState::Closed, now);
                true
            } else {
                false
            }
        };

        if closed {
            self.mirror(CircuitState::Closed).await;
        }
    }

    /// Manually force the circuit open.
    pub async fn force_open(&self) {
        {
            let mut inner = self.inner.lock().await;
            let now = self.clock.now();
            self.transition(&mut inner, CircuitState::Open, now);
        }
        self.mirror(CircuitState::Open).await;
    }

    /// Apply a transition to local state. The caller mirrors it once the
    /// lock is released.
    fn transition(&self, inner: &mut BreakerState, to: CircuitState, now: f64) {
        let from = inner.state;
        inner.state = to;

        match to {
            CircuitState::Open => {
                inner.opened_at = Some(now);
                inner.half_open_at = None;
                warn!(
                    name = %self.config.name,
                    failures = inner.failures,
                    from = %from,
                    "Circuit breaker OPENED"
                );
            }
            CircuitState::HalfOpen => {
                inner.failures = 0;
                inner.half_open_at = Some(now);
                info!(name = %self.config.name, "Circuit breaker transitioning to HALF-OPEN");
            }
            CircuitState::Closed => {
                let backoff = inner.read_backoff_until;
                *inner = BreakerState::closed();
                inner.read_backoff_until = backoff;
                info!(name = %self.config.name, from = %from, "Circuit breaker CLOSED");
            }
        }
    }

    /// Best-effort write of the state to the shared store.
    async fn mirror(&self, state: CircuitState) {
        let Some(store) = self.store.store() else {
            return;
        };

        let ttl = self.config.ttl_for(state);
        if let Err(e) = store
            .set(&self.config.state_key, state.as_str(), ttl)
            .await
        {
            error!(
                name = %self.config.name,
                state = %state,
                error = %e,
                "Failed to mirror circuit state"
            );
        }
    }

    /// Read a peer's `open` while this breaker is closed.
    ///
    /// Returns the peer's remaining cooldown. Runs without the lock held.
    async fn read_mirror(&self) -> Option<Duration> {
        let store = self.store.store()?;

        {
            let inner = self.inner.lock().await;
            if inner.state != CircuitState::Closed || self.clock.now() < inner.read_backoff_until {
                return None;
            }
        }

        let key = &self.config.state_key;
        let mirrored = match store.get(key).await {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(e) => {
                debug!(name = %self.config.name, error = %e, "Circuit state read failed, using local state");
                let mut inner = self.inner.lock().await;
                inner.read_backoff_until = self.clock.now() + MIRROR_READ_BACKOFF.as_secs_f64();
                return None;
            }
        };

        match mirrored.parse::<CircuitState>() {
            Ok(CircuitState::Open) => {
                let reset_timeout = self.config.reset_timeout;
                // Remaining TTL tells how far into its cooldown the peer is
                let remaining = match store.ttl(key).await {
                    Ok(Some(ttl)) => ttl.min(reset_timeout),
                    _ => reset_timeout,
                };
                Some(remaining)
            }
            Ok(_) => None,
            Err(e) => {
                debug!(name = %self.config.name, error = %e, "Ignoring unreadable circuit state");
                None
            }
        }
    }

    /// Adopt a peer's `open`, unless this breaker left Closed meanwhile.
    fn adopt_peer_open(&self, inner: &mut BreakerState, remaining: Duration) {
        if inner.state != CircuitState::Closed {
            return;
        }

        let reset_timeout = self.config.reset_timeout;
        let now = self.clock.now();
        inner.state = CircuitState::Open;
        inner.opened_at = Some(now - (reset_timeout - remaining).as_secs_f64());
        inner.half_open_at = None;
        warn!(
            name = %self.config.name,
            remaining = remaining.as_secs(),
            "Circuit breaker adopted OPEN state from peer"
        );
    }

    // Metrics

    /// Get total requests processed.
    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Get total successful requests.
    pub fn total_successes(&self) -> u64 {
        self.total_successes.load(Ordering::Relaxed)
    }

    /// Get total failed requests.
    pub fn total_failures(&self) -> u64 {
        self.total_failures.load(Ordering::Relaxed)
    }

    /// Get total rejected requests (circuit open).
    pub fn total_rejections(&self) -> u64 {
        self.total_rejections.load(Ordering::Relaxed)
    }

    /// Get circuit breaker statistics.
    pub async fn stats(&self) -> CircuitBreakerStats {
        let (state, failures) = {
            let inner = self.inner.lock().await;
            (inner.state, inner.failures)
        };

        CircuitBreakerStats {
            name: self.config.name.clone(),
            state,
            total_requests: self.total_requests(),
            total_successes: self.total_successes(),
            total_failures: self.total_failures(),
            total_rejections: self.total_rejections(),
            current_failure_count: failures,
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish()
    }
}

/// Round a wait up to whole seconds, never negative.
fn whole_secs(secs: f64) -> Duration {
    Duration::from_secs(secs.max(0.0).ceil() as u64)
}

/// Circuit breaker statistics.
#[derive(Debug, Clone)]
pub struct CircuitBreakerStats {
    /// Circuit breaker name.
    pub name: String,
    /// Current state.
    pub state: CircuitState,
    /// Total requests.
    pub total_requests: u64,
    /// Total successes.
    pub total_successes: u64,
    /// Total failures.
    pub total_failures: u64,
    /// Total rejections.
    pub total_rejections: u64,
    /// Current consecutive failure count.
    pub current_failure_count: u32,
}

impl CircuitBreakerStats {
    /// Calculate success rate (0.0 - 1.0).
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            1.0
        } else {
            self.total_successes as f64 / self.total_requests as f64
        }
    }

    /// Calculate failure rate (0.0 - 1.0).
    pub fn failure_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.total_failures as f64 / self.total_requests as f64
        }
    }
}
