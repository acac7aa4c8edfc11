//! Process-local sliding window log.
//!
//! Fallback used when the shared store is unreachable. It keeps the same
//! semantics as the store-side window so that decisions do not change shape
//! when the limiter degrades:
//!
//! 1. Timestamps at or before `now - window` are dropped
//! 2. The current timestamp is logged, even if the call ends up denied
//! 3. The surviving entries are counted
//!
//! The log is not coordinated across instances.

use dashmap::DashMap;
use rampart_store::WindowSnapshot;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// One client's log
#[derive(Debug, Default)]
struct WindowLog {
    /// Request timestamps, oldest first
    stamps: VecDeque<f64>,
    /// When the newest entry leaves its window
    expires_at: f64,
}

/// Sliding window log keyed by client
///
/// A key lives for one window after its last request, like the store-side
/// key expiry. Expired keys are swept at most once per window.
#[derive(Debug)]
pub struct SlidingWindowLog {
    logs: DashMap<String, WindowLog>,
    /// `f64` bits of the next sweep instant
    next_sweep_at: AtomicU64,
}

impl Default for SlidingWindowLog {
    fn default() -> Self {
        Self {
            logs: DashMap::new(),
            next_sweep_at: AtomicU64::new(f64::NEG_INFINITY.to_bits()),
        }
    }
}

impl SlidingWindowLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Prune, record `now`, and report the window.
    ///
    /// The per-key entry lock is held for the whole update, so concurrent
    /// callers on one key are serialized.
    pub fn record(&self, key: &str, now: f64, cutoff: f64) -> WindowSnapshot {
        let window = (now - cutoff).max(0.0);
        self.maybe_sweep(now, window);

        let mut entry = self.logs.entry(key.to_string()).or_default();

        // Remove old timestamps
        while let Some(front) = entry.stamps.front() {
            if *front <= cutoff {
                entry.stamps.pop_front();
            } else {
                break;
            }
        }

        // Keep the log ordered even if the clock stepped backwards
        let at = entry.stamps.partition_point(|ts| *ts <= now);
        entry.stamps.insert(at, now);
        entry.expires_at = entry.expires_at.max(now + window);

        WindowSnapshot {
            count: entry.stamps.len() as u64,
            oldest: entry.stamps.front().copied(),
        }
    }

    /// Number of entries newer than `cutoff`
    ///
    /// A key with no such entries is dropped.
    pub fn count(&self, key: &str, cutoff: f64) -> u64 {
        if self
            .logs
            .remove_if(key, |_, log| log.stamps.back().is_none_or(|ts| *ts <= cutoff))
            .is_some()
        {
            return 0;
        }

        self.logs
            .get(key)
            .map(|log| log.stamps.iter().filter(|ts| **ts > cutoff).count() as u64)
            .unwrap_or(0)
    }

    /// Forget a key
    pub fn reset(&self, key: &str) {
        self.logs.remove(key);
    }

    /// Drop every key whose window has passed. Returns how many were dropped.
    pub fn sweep(&self, now: f64) -> usize {
        let before = self.logs.len();
        self.logs.retain(|_, log| log.expires_at > now);
        before.saturating_sub(self.logs.len())
    }

    /// Number of tracked keys
    pub fn len(&self) -> usize {
        self.logs.len()
    }

    /// Whether no keys are tracked
    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    fn maybe_sweep(&self, now: f64, window: f64) {
        let due = self.next_sweep_at.load(Ordering::Relaxed);
        if now < f64::from_bits(due) {
            return;
        }
        // Only the caller that moves the deadline sweeps
        let next = (now + window).to_bits();
        if self
            .next_sweep_at
            .compare_exchange(due, next, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
        {
            self.sweep(now);
        }
    }
}
