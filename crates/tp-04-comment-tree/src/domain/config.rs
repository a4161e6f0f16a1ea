use serde::{Deserialize, Serialize};
use shared_types::{BackoffPolicy, SortOrder};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Sort mode for sibling ordering.
    pub sort: SortOrder,
    pub lock_ttl_ms: u64,
    pub lock_attempts: u32,
    pub lock_retry_ms: u64,
    pub store_timeout_ms: u64,
    /// Consecutive failed passes before a root is parked for the
    /// maintenance retry.
    pub pass_attempts: u32,
    /// Delay between failed passes.
    pub retry: BackoffPolicy,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            sort: SortOrder::Hot,
            lock_ttl_ms: 10_000,
            lock_attempts: 50,
            lock_retry_ms: 20,
            store_timeout_ms: 1_000,
            pass_attempts: 3,
            retry: BackoffPolicy {
                base_ms: 50,
                max_ms: 2_000,
                ..BackoffPolicy::default()
            },
        }
    }
}

impl TreeConfig {
    pub fn for_testing() -> Self {
        Self {
            lock_attempts: 500,
            lock_retry_ms: 1,
            store_timeout_ms: 2_000,
            retry: BackoffPolicy::for_testing(),
            ..Self::default()
        }
    }
}
