use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Items kept per listing.
    pub max_items: usize,
    /// Minimum spacing between two rebuilds of the same key.
    pub debounce_ms: u64,
    /// How many generations a cursor may trail before it is restarted.
    pub max_generation_lag: u64,
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub lock_ttl_ms: u64,
    pub lock_attempts: u32,
    pub lock_retry_ms: u64,
    pub store_timeout_ms: u64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            max_items: 1_000,
            debounce_ms: 5_000,
            max_generation_lag: 0,
            default_page_size: 25,
            max_page_size: 100,
            lock_ttl_ms: 10_000,
            lock_attempts: 20,
            lock_retry_ms: 25,
            store_timeout_ms: 1_000,
        }
    }
}

impl ListingConfig {
    pub fn for_testing() -> Self {
        Self {
            max_items: 50,
            debounce_ms: 1_000,
            lock_attempts: 3,
            lock_retry_ms: 1,
            store_timeout_ms: 2_000,
            ..Self::default()
        }
    }

    /// Clamp a requested page size; `0` means the default.
    pub fn page_size(&self, requested: usize) -> usize {
        match requested {
            0 => self.default_page_size,
            n => n.min(self.max_page_size),
        }
        .max(1)
    }
}
