//! In-process request throttles.
//!
//! Both helpers are best-effort: state lives in process memory, is lost on
//! restart, and is not shared across horizontally scaled instances. The
//! durable CAS transitions and uniqueness constraints in the database are
//! the actual integrity mechanisms; these only blunt request storms.
//!
//! Every method takes `now` explicitly so the window edges are testable.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::types::DbId;

/// Keys retained before a full sweep of stale entries.
const MAX_TRACKED_KEYS: usize = 16_384;

/// Minimum-interval throttle keyed by entity id.
///
/// Used for the per-session completion cooldown: at most one settlement
/// attempt per key per `cooldown` interval.
#[derive(Debug, Default)]
pub struct CooldownMap {
    last_attempt: Mutex<HashMap<DbId, Instant>>,
}

impl CooldownMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an attempt for `key`. Returns `false` if a previous attempt
    /// happened less than `cooldown` ago, `true` otherwise.
    pub fn try_acquire(&self, key: DbId, now: Instant, cooldown: Duration) -> bool {
        let mut map = self.last_attempt.lock().expect("cooldown map poisoned");

        if map.len() > MAX_TRACKED_KEYS {
            map.retain(|_, last| now.duration_since(*last) < cooldown);
        }

        match map.get(&key) {
            Some(last) if now.duration_since(*last) < cooldown => false,
            _ => {
                map.insert(key, now);
                true
            }
        }
    }
}

/// Sliding-window attempt counter keyed by entity id.
///
/// Used to bound payment-verification attempts per user per time window.
#[derive(Debug, Default)]
pub struct AttemptWindow {
    attempts: Mutex<HashMap<DbId, Vec<Instant>>>,
}

impl AttemptWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an attempt for `key`. Returns `false` if `max_attempts` have
    /// already happened within the past `window`, `true` otherwise.
    pub fn try_acquire(&self, key: DbId, now: Instant, window: Duration, max_attempts: usize) -> bool {
        let mut map = self.attempts.lock().expect("attempt window poisoned");

        if map.len() > MAX_TRACKED_KEYS {
            map.retain(|_, times| times.iter().any(|t| now.duration_since(*t) < window));
        }

        let times = map.entry(key).or_default();
        times.retain(|t| now.duration_since(*t) < window);

        if times.len() >= max_attempts {
            return false;
        }
        times.push(now);
        true
    }
}
