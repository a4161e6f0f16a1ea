//! In-process LRU store for the volatile and stale tiers.

use crate::domain::{CacheEntry, LruStats, TtlLru};
use crate::ports::CacheStore;
use parking_lot::Mutex;
use shared_types::Timestamp;

/// `CacheStore` over a mutex-guarded [`TtlLru`].
///
/// The lock is never held across an await point.
pub struct LruCacheStore {
    inner: Mutex<TtlLru>,
}

impl LruCacheStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(TtlLru::with_capacity(capacity)),
        }
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

impl CacheStore for LruCacheStore {
    fn get(&self, key: &str, now: Timestamp) -> Option<CacheEntry> {
        self.inner.lock().get(key, now)
    }

    fn set(&self, entry: CacheEntry) {
        self.inner.lock().put(entry);
    }

    fn remove(&self, key: &str) -> Option<CacheEntry> {
        self.inner.lock().pop(key)
    }

    fn purge_expired(&self, now: Timestamp) -> usize {
        self.inner.lock().purge_expired(now)
    }

    fn stats(&self) -> LruStats {
        self.inner.lock().stats()
    }
}
