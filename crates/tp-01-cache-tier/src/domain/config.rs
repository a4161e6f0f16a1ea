//! Cache tier configuration.

use super::errors::CacheError;
use serde::{Deserialize, Serialize};

/// Sizing and timing of the four tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Max entries in the volatile LRU.
    pub volatile_capacity: usize,
    /// Default volatile TTL.
    pub volatile_ttl_ms: u64,
    /// Max entries in the stale LRU.
    pub stale_capacity: usize,
    /// Stale TTL. Must exceed the volatile TTL.
    pub stale_ttl_ms: u64,
    /// TTL of a RecomputeLock. Bounds how long a crashed holder blocks others.
    pub lock_ttl_ms: u64,
    /// How long a caller that lost the lock race and found no stale copy
    /// waits before computing anyway.
    pub lock_wait_ms: u64,
    /// Poll interval during that wait.
    pub lock_poll_ms: u64,
    /// TTL for durable-tier entries. Durable entries always expire.
    pub durable_ttl_ms: u64,
    /// Deadline for a single durable-tier call.
    pub durable_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            volatile_capacity: 50_000,
            volatile_ttl_ms: 60_000,
            stale_capacity: 50_000,
            stale_ttl_ms: 30 * 60_000,
            lock_ttl_ms: 5_000,
            lock_wait_ms: 1_000,
            lock_poll_ms: 25,
            durable_ttl_ms: 24 * 60 * 60_000,
            durable_timeout_ms: 500,
        }
    }
}

impl CacheConfig {
    /// Small tiers and short waits for tests.
    pub fn for_testing() -> Self {
        Self {
            volatile_capacity: 128,
            volatile_ttl_ms: 10_000,
            stale_capacity: 128,
            stale_ttl_ms: 60_000,
            lock_ttl_ms: 2_000,
            lock_wait_ms: 1_500,
            lock_poll_ms: 5,
            durable_ttl_ms: 60_000,
            durable_timeout_ms: 500,
        }
    }

    pub fn validate(&self) -> Result<(), CacheError> {
        if self.volatile_capacity == 0 || self.stale_capacity == 0 {
            return Err(CacheError::Config("tier capacity must be non-zero".into()));
        }
        if self.volatile_ttl_ms == 0 || self.lock_ttl_ms == 0 || self.durable_ttl_ms == 0 {
            return Err(CacheError::Config("TTLs must be non-zero".into()));
        }
        if self.stale_ttl_ms <= self.volatile_ttl_ms {
            return Err(CacheError::Config(format!(
                "stale TTL ({}ms) must exceed volatile TTL ({}ms)",
                self.stale_ttl_ms, self.volatile_ttl_ms
            )));
        }
        if self.lock_poll_ms == 0 || self.lock_poll_ms > self.lock_wait_ms.max(1) {
            return Err(CacheError::Config(
                "lock poll interval must be non-zero and within the lock wait".into(),
            ));
        }
        Ok(())
    }
}
