//! Ledger counters, exported by the worker runtime.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct LedgerStats {
    pub applied: AtomicU64,
    pub noops: AtomicU64,
    pub rejected: AtomicU64,
    pub quarantined: AtomicU64,
    /// Lock attempts that found the item lock held.
    pub lock_retries: AtomicU64,
}

impl LedgerStats {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> LedgerStatsSnapshot {
        LedgerStatsSnapshot {
            applied: self.applied.load(Ordering::Relaxed),
            noops: self.noops.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            quarantined: self.quarantined.load(Ordering::Relaxed),
            lock_retries: self.lock_retries.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerStatsSnapshot {
    pub applied: u64,
    pub noops: u64,
    pub rejected: u64,
    pub quarantined: u64,
    pub lock_retries: u64,
}
