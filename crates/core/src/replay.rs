//! In-process transaction-hash cache.
//!
//! Fast-path layer of the replay guard: hashes confirmed (or observed in
//! flight) during this process lifetime are rejected without touching the
//! database. The durable partial unique index on `payments.tx_hash` is the
//! authoritative guard; this cache is lost on restart and is only a latency
//! optimization.

use std::collections::HashSet;
use std::sync::Mutex;

/// Hashes retained before the cache is dropped and restarted.
const MAX_CACHED_HASHES: usize = 65_536;

#[derive(Debug, Default)]
pub struct ReplayCache {
    seen: Mutex<HashSet<String>>,
}

impl ReplayCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `hash` was already recorded in this process lifetime.
    pub fn contains(&self, hash: &str) -> bool {
        self.seen.lock().expect("replay cache poisoned").contains(hash)
    }

    /// Record `hash`. Returns `false` if it was already present.
    pub fn insert(&self, hash: &str) -> bool {
        let mut seen = self.seen.lock().expect("replay cache poisoned");
        if seen.len() >= MAX_CACHED_HASHES {
            // Cache only; dropping it merely falls back to the durable check.
            seen.clear();
        }
        seen.insert(hash.to_string())
    }
}
