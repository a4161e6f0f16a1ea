//! Outbound (Driven) ports for the Cache Tier.
//!
//! Each tier is independently swappable. The in-memory adapters in
//! `adapters/` are used by default; the RocksDB adapter backs the durable
//! tier in production.

use crate::domain::{CacheEntry, LruStats, RecomputeLock};
use shared_types::{StoreError, Timestamp};

/// Abstract interface for the persistent key-value store behind the durable
/// tier. Also used directly by the Vote Ledger, Comment-Tree Maintainer and
/// Listing Index for their persisted state.
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Put a single key-value pair.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Delete a key. Deleting a missing key is not an error.
    fn delete(&self, key: &[u8]) -> Result<(), StoreError>;

    /// Execute an atomic batch write.
    ///
    /// Either ALL operations in the batch are applied, or NONE are.
    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), StoreError>;

    /// Check if a key exists.
    fn exists(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.get(key)?.is_some())
    }

    /// All pairs whose key starts with `prefix`, in key order.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;
}

/// Batch operation for atomic writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Put a key-value pair.
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Delete a key.
    Delete { key: Vec<u8> },
}

impl BatchOperation {
    /// Create a Put operation.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a Delete operation.
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete { key: key.into() }
    }
}

/// Short-TTL mutual exclusion. Never holds data.
pub trait LockTier: Send + Sync {
    /// Take the lock for `key` if free or expired. Non-blocking.
    fn try_acquire(&self, key: &str, ttl_ms: u64) -> Option<RecomputeLock>;

    /// Release `lock` if it is still owned by its token. Returns whether a
    /// lock was removed; an expired-and-retaken lock is left alone.
    fn release(&self, lock: &RecomputeLock) -> bool;

    /// Whether a live lock exists for `key`.
    fn is_held(&self, key: &str) -> bool;

    /// Number of live locks.
    fn held_count(&self) -> usize;

    /// Drop expired locks. Returns how many were removed.
    fn purge_expired(&self) -> usize;
}

/// In-memory tier holding [`CacheEntry`] values (volatile or stale).
///
/// Implementations may drop any entry at any time.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str, now: Timestamp) -> Option<CacheEntry>;

    fn set(&self, entry: CacheEntry);

    /// Remove and return the entry for `key`.
    fn remove(&self, key: &str) -> Option<CacheEntry>;

    fn purge_expired(&self, now: Timestamp) -> usize;

    fn stats(&self) -> LruStats;
}
