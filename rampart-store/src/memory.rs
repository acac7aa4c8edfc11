//! In-process shared store.
//!
//! Implements the full [`SharedStore`] contract inside one process: strings,
//! counters, sorted sets and per-key expiry. Expiry is evaluated lazily
//! against the injected [`Clock`], so tests can drive time explicitly.
//! Suitable for single-instance deployments or testing. For cross-instance
//! coordination, use the Redis store.

use crate::clock::{SharedClock, system_clock};
use crate::error::{StoreError, StoreResult};
use crate::store::{SharedStore, WindowSnapshot};
use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, trace};

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    /// Members ordered by score.
    Sorted(Vec<(String, f64)>),
}

#[derive(Debug, Clone)]
struct Slot {
    value: Value,
    expires_at: Option<f64>,
}

impl Slot {
    fn is_expired(&self, now: f64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Seconds between sweeps of expired keys.
const SWEEP_INTERVAL_SECS: f64 = 60.0;

fn wrong_type(key: &str) -> StoreError {
    StoreError::command(format!(
        "WRONGTYPE Operation against a key holding the wrong kind of value: {}",
        key
    ))
}

/// In-memory shared store
///
/// Expired keys are dropped when touched, and the whole keyspace is swept
/// for them at most once a minute, so keys that are never touched again do
/// not accumulate.
pub struct MemoryStore {
    slots: Mutex<HashMap<String, Slot>>,
    /// `f64` bits of the next sweep instant. Only touched under `slots`.
    next_sweep_at: AtomicU64,
    clock: SharedClock,
}

impl MemoryStore {
    /// Create a new in-memory store on the system clock
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    /// Create a new in-memory store on the given clock
    pub fn with_clock(clock: SharedClock) -> Self {
        debug!("Creating new in-memory shared store");
        Self {
            slots: Mutex::new(HashMap::new()),
            next_sweep_at: AtomicU64::new(0f64.to_bits()),
            clock,
        }
    }

    /// Number of live keys (for monitoring)
    pub fn key_count(&self) -> usize {
        let now = self.clock.now();
        self.slots
            .lock()
            .values()
            .filter(|slot| !slot.is_expired(now))
            .count()
    }

    /// Drop every key.
    pub fn clear(&self) {
        self.slots.lock().clear();
    }

    /// Drop every expired key now.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut slots = self.slots.lock();
        Self::sweep(&mut slots, now)
    }

    fn sweep(slots: &mut HashMap<String, Slot>, now: f64) -> usize {
        let before = slots.len();
        slots.retain(|_, slot| !slot.is_expired(now));
        let removed = before - slots.len();
        if removed > 0 {
            trace!(removed = removed, "Swept expired keys");
        }
        removed
    }

    /// Lock the keyspace, sweeping expired keys first when a sweep is due.
    fn lock_slots(&self, now: f64) -> MutexGuard<'_, HashMap<String, Slot>> {
        let mut slots = self.slots.lock();
        if now >= f64::from_bits(self.next_sweep_at.load(Ordering::Relaxed)) {
            Self::sweep(&mut slots, now);
            self.next_sweep_at
                .store((now + SWEEP_INTERVAL_SECS).to_bits(), Ordering::Relaxed);
        }
        slots
    }

    /// Run `f` against the live slot for `key`, purging it first if expired.
    fn with_slot<T>(&self, key: &str, f: impl FnOnce(Option<&mut Slot>, f64) -> T) -> T {
        let now = self.clock.now();
        let mut slots = self.lock_slots(now);
        if slots.get(key).is_some_and(|slot| slot.is_expired(now)) {
            slots.remove(key);
        }
        f(slots.get_mut(key), now)
    }

    fn sorted_mut<'a>(
        slots: &'a mut HashMap<String, Slot>,
        key: &str,
    ) -> StoreResult<&'a mut Vec<(String, f64)>> {
        let slot = slots.entry(key.to_string()).or_insert_with(|| Slot {
            value: Value::Sorted(Vec::new()),
            expires_at: None,
        });
        match &mut slot.value {
            Value::Sorted(members) => Ok(members),
            Value::Str(_) => Err(wrong_type(key)),
        }
    }

    fn insert_member(members: &mut Vec<(String, f64)>, member: &str, score: f64) {
        members.retain(|(m, _)| m != member);
        let at = members.partition_point(|(_, s)| *s <= score);
        members.insert(at, (member.to_string(), score));
    }

    fn purge_expired(slots: &mut HashMap<String, Slot>, key: &str, now: f64) {
        if slots.get(key).is_some_and(|slot| slot.is_expired(now)) {
            slots.remove(key);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.with_slot(key, |slot, _| match slot {
            None => Ok(None),
            Some(Slot {
                value: Value::Str(s),
                ..
            }) => Ok(Some(s.clone())),
            Some(_) => Err(wrong_type(key)),
        })
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let now = self.clock.now();
        self.lock_slots(now).insert(
            key.to_string(),
            Slot {
                value: Value::Str(value.to_string()),
                expires_at: ttl.map(|ttl| now + ttl.as_secs_f64()),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let now = self.clock.now();
        let removed = self.lock_slots(now).remove(key);
        Ok(removed.is_some_and(|slot| !slot.is_expired(now)))
    }

    async fn incr(&self, key: &str, delta: i64) -> StoreResult<i64> {
        let now = self.clock.now();
        let mut slots = self.lock_slots(now);
        Self::purge_expired(&mut slots, key, now);

        let slot = slots.entry(key.to_string()).or_insert_with(|| Slot {
            value: Value::Str("0".to_string()),
            expires_at: None,
        });
        let Value::Str(current) = &mut slot.value else {
            return Err(wrong_type(key));
        };
        let parsed: i64 = current
            .parse()
            .map_err(|_| StoreError::command("ERR value is not an integer or out of range"))?;
        let next = parsed
            .checked_add(delta)
            .ok_or_else(|| StoreError::command("ERR increment or decrement would overflow"))?;
        *current = next.to_string();
        Ok(next)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        self.with_slot(key, |slot, now| match slot {
            Some(slot) => {
                slot.expires_at = Some(now + ttl.as_secs_f64());
                Ok(true)
            }
            None => Ok(false),
        })
    }

    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>> {
        self.with_slot(key, |slot, now| {
            Ok(slot
                .and_then(|slot| slot.expires_at)
                .map(|at| Duration::from_secs_f64((at - now).max(0.0))))
        })
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> StoreResult<()> {
        let now = self.clock.now();
        let mut slots = self.lock_slots(now);
        Self::purge_expired(&mut slots, key, now);
        let members = Self::sorted_mut(&mut slots, key)?;
        Self::insert_member(members, member, score);
        Ok(())
    }

    async fn zrange_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> StoreResult<Vec<(String, f64)>> {
        self.with_slot(key, |slot, _| match slot {
            None => Ok(Vec::new()),
            Some(Slot {
                value: Value::Sorted(members),
                ..
            }) => Ok(members
                .iter()
                .filter(|(_, s)| *s >= min && *s <= max)
                .cloned()
                .collect()),
            Some(_) => Err(wrong_type(key)),
        })
    }

    async fn zrem_range_by_score(&self, key: &str, min: f64, max: f64) -> StoreResult<u64> {
        self.with_slot(key, |slot, _| match slot {
            None => Ok(0),
            Some(Slot {
                value: Value::Sorted(members),
                ..
            }) => {
                let before = members.len();
                members.retain(|(_, s)| *s < min || *s > max);
                Ok((before - members.len()) as u64)
            }
            Some(_) => Err(wrong_type(key)),
        })
    }

    async fn zcard(&self, key: &str) -> StoreResult<u64> {
        self.with_slot(key, |slot, _| match slot {
            None => Ok(0),
            Some(Slot {
                value: Value::Sorted(members),
                ..
            }) => Ok(members.len() as u64),
            Some(_) => Err(wrong_type(key)),
        })
    }

    async fn record_window(
        &self,
        key: &str,
        member: &str,
        now: f64,
        cutoff: f64,
        ttl: Duration,
    ) -> StoreResult<WindowSnapshot> {
        trace!(key = %key, now = now, cutoff = cutoff, "Memory sliding window update");

        // One lock acquisition covers all four steps
        let clock_now = self.clock.now();
        let mut slots = self.lock_slots(clock_now);
        Self::purge_expired(&mut slots, key, clock_now);

        let members = Self::sorted_mut(&mut slots, key)?;
        members.retain(|(_, s)| *s > cutoff);
        Self::insert_member(members, member, now);
        let count = members.len() as u64;
        let oldest = members.first().map(|(_, s)| *s);

        if let Some(slot) = slots.get_mut(key) {
            slot.expires_at = Some(clock_now + ttl.as_secs_f64());
        }

        Ok(WindowSnapshot { count, oldest })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("keys", &self.key_count())
            .finish()
    }
}
