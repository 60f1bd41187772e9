/// Keyed mutual-exclusion lock for expensive recomputes
///
/// Semantics are set-if-absent-with-expiry: acquisition succeeds only when no
/// live holder exists for the key. Each grant carries a nonce so a guard that
/// outlives its TTL cannot release a later holder's slot. Expiry makes the
/// lock self-healing when a holder crashes without dropping its guard.

use crate::logger::{self, LogTag};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

struct LockSlot {
    expires_at: Instant,
    nonce: u64,
}

pub struct RecomputeLock {
    slots: Mutex<HashMap<String, LockSlot>>,
    ttl: Duration,
    next_nonce: Mutex<u64>,
}

impl RecomputeLock {
    pub fn new(ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            slots: Mutex::new(HashMap::new()),
            ttl,
            next_nonce: Mutex::new(0),
        })
    }

    /// Try to acquire the lock for `key`. Returns None when a live holder
    /// exists; contention is a defined outcome, not an error.
    pub fn acquire(self: &Arc<Self>, key: &str) -> Option<RecomputeGuard> {
        let nonce = {
            let mut counter = self.next_nonce.lock().unwrap();
            *counter += 1;
            *counter
        };

        let mut slots = self.slots.lock().unwrap();
        let now = Instant::now();

        if let Some(slot) = slots.get(key) {
            if slot.expires_at > now {
                logger::debug(
                    LogTag::Cache,
                    &format!("Recompute lock contended for key {}", key),
                );
                return None;
            }
            // Stale slot from a crashed holder; reclaim it
            logger::warning(
                LogTag::Cache,
                &format!("Reclaiming expired recompute lock for key {}", key),
            );
        }

        slots.insert(
            key.to_string(),
            LockSlot {
                expires_at: now + self.ttl,
                nonce,
            },
        );

        Some(RecomputeGuard {
            lock: Arc::clone(self),
            key: key.to_string(),
            nonce,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn release(&self, key: &str, nonce: u64) {
        let mut slots = self.slots.lock().unwrap();
        // Only the nonce that took the slot may free it; an expired guard
        // must not release a successor's lock
        if slots.get(key).map(|s| s.nonce) == Some(nonce) {
            slots.remove(key);
        }
    }
}

/// RAII guard: dropping it releases the lock on every exit path
pub struct RecomputeGuard {
    lock: Arc<RecomputeLock>,
    key: String,
    nonce: u64,
}

impl Drop for RecomputeGuard {
    fn drop(&mut self) {
        self.lock.release(&self.key, self.nonce);
    }
}
