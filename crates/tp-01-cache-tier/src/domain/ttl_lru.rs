//! # TTL-Aware LRU
//!
//! In-memory LRU used by the volatile and stale tiers.
//!
//! ## Algorithm: Lazy Expiry
//!
//! - Read: an expired entry is removed and reported as a miss
//! - Write: replaces any previous entry for the key
//! - Capacity: least recently used entry is evicted first
//! - `purge_expired`: optional sweep; correctness never depends on it

use super::entities::CacheEntry;
use lru::LruCache;
use shared_types::Timestamp;
use std::num::NonZeroUsize;

/// LRU of cache entries with per-entry expiry.
pub struct TtlLru {
    cache: LruCache<String, CacheEntry>,
    evictions: u64,
    expirations: u64,
}

impl TtlLru {
    /// Create with the given capacity (clamped to at least 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(cap),
            evictions: 0,
            expirations: 0,
        }
    }

    /// Live entry for `key`, refreshing its recency.
    pub fn get(&mut self, key: &str, now: Timestamp) -> Option<CacheEntry> {
        let expired = self.cache.peek(key)?.is_expired(now);
        if expired {
            self.cache.pop(key);
            self.expirations += 1;
            return None;
        }
        self.cache.get(key).cloned()
    }

    /// Insert or replace.
    pub fn put(&mut self, entry: CacheEntry) {
        if let Some((evicted_key, _)) = self.cache.push(entry.key.clone(), entry) {
            // `push` returns the old value for the same key on replace.
            if self.cache.peek(&evicted_key).is_none() {
                self.evictions += 1;
            }
        }
    }

    pub fn pop(&mut self, key: &str) -> Option<CacheEntry> {
        self.cache.pop(key)
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&mut self, now: Timestamp) -> usize {
        let expired: Vec<String> = self
            .cache
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.cache.pop(key);
        }
        self.expirations += expired.len() as u64;
        expired.len()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn stats(&self) -> LruStats {
        LruStats {
            entries: self.cache.len(),
            capacity: self.cache.cap().get(),
            evictions: self.evictions,
            expirations: self.expirations,
        }
    }
}

/// Snapshot of an LRU's occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LruStats {
    pub entries: usize,
    pub capacity: usize,
    pub evictions: u64,
    pub expirations: u64,
}
