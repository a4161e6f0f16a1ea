use serde::{Deserialize, Serialize};

/// Vote ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// TTL of the per-item RecomputeLock.
    pub lock_ttl_ms: u64,
    /// Attempts to take a contended item lock before giving up.
    pub lock_attempts: u32,
    /// Pause between lock attempts.
    pub lock_retry_ms: u64,
    /// Deadline for each durable store call.
    pub store_timeout_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_ttl_ms: 5_000,
            lock_attempts: 50,
            lock_retry_ms: 10,
            store_timeout_ms: 500,
        }
    }
}

impl LedgerConfig {
    pub fn for_testing() -> Self {
        Self {
            lock_ttl_ms: 2_000,
            lock_attempts: 1_000,
            lock_retry_ms: 1,
            store_timeout_ms: 2_000,
        }
    }
}
