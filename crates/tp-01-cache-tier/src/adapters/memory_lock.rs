//! In-memory lock tier.
//!
//! Locks live in a sharded `DashMap`; acquisition uses the entry API so the
//! check-and-insert is atomic per key. Expiry is evaluated on every access
//! against the injected clock, so a crashed holder never blocks a key past
//! its TTL.

use crate::domain::RecomputeLock;
use crate::ports::LockTier;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shared_types::TimeSource;
use std::sync::Arc;
use tracing::debug;

pub struct InMemoryLockTier {
    locks: DashMap<String, RecomputeLock>,
    time: Arc<dyn TimeSource>,
}

impl InMemoryLockTier {
    pub fn new(time: Arc<dyn TimeSource>) -> Self {
        Self {
            locks: DashMap::new(),
            time,
        }
    }

    /// Number of lock records, live or expired.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl LockTier for InMemoryLockTier {
    fn try_acquire(&self, key: &str, ttl_ms: u64) -> Option<RecomputeLock> {
        let now = self.time.now();
        match self.locks.entry(key.to_string()) {
            Entry::Occupied(mut held) => {
                if !held.get().is_expired(now) {
                    return None;
                }
                debug!(key, previous_owner = %held.get().owner_token, "Taking over expired lock");
                let lock = RecomputeLock::new(key, now, ttl_ms);
                held.insert(lock.clone());
                Some(lock)
            }
            Entry::Vacant(slot) => {
                let lock = RecomputeLock::new(key, now, ttl_ms);
                slot.insert(lock.clone());
                Some(lock)
            }
        }
    }

    fn release(&self, lock: &RecomputeLock) -> bool {
        self.locks
            .remove_if(&lock.key, |_, held| held.owner_token == lock.owner_token)
            .is_some()
    }

    fn is_held(&self, key: &str) -> bool {
        let now = self.time.now();
        self.locks
            .get(key)
            .map_or(false, |held| !held.is_expired(now))
    }

    fn held_count(&self) -> usize {
        let now = self.time.now();
        self.locks.iter().filter(|held| !held.is_expired(now)).count()
    }

    fn purge_expired(&self) -> usize {
        let now = self.time.now();
        let before = self.locks.len();
        self.locks.retain(|_, held| !held.is_expired(now));
        before.saturating_sub(self.locks.len())
    }
}
