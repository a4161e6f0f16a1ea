use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct TreeStats {
    pub rebuilds: AtomicU64,
    pub resorts: AtomicU64,
    /// Signals absorbed by a pending or running pass.
    pub coalesced: AtomicU64,
    /// Rank-only passes that had to relink the whole tree.
    pub escalations: AtomicU64,
    pub failures: AtomicU64,
}

impl TreeStats {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TreeStatsSnapshot {
        TreeStatsSnapshot {
            rebuilds: self.rebuilds.load(Ordering::Relaxed),
            resorts: self.resorts.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            escalations: self.escalations.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStatsSnapshot {
    pub rebuilds: u64,
    pub resorts: u64,
    pub coalesced: u64,
    pub escalations: u64,
    pub failures: u64,
}
