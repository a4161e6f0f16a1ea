use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct ListingStats {
    pub rebuilds: AtomicU64,
    /// Invalidations absorbed by the debounce.
    pub deferred: AtomicU64,
    pub failures: AtomicU64,
    pub sweeps: AtomicU64,
    pub restarted_cursors: AtomicU64,
    pub pages_served: AtomicU64,
    /// Reads of a listing another worker was still building.
    pub empty_pages: AtomicU64,
}

impl ListingStats {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ListingStatsSnapshot {
        ListingStatsSnapshot {
            rebuilds: self.rebuilds.load(Ordering::Relaxed),
            deferred: self.deferred.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            sweeps: self.sweeps.load(Ordering::Relaxed),
            restarted_cursors: self.restarted_cursors.load(Ordering::Relaxed),
            pages_served: self.pages_served.load(Ordering::Relaxed),
            empty_pages: self.empty_pages.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListingStatsSnapshot {
    pub rebuilds: u64,
    pub deferred: u64,
    pub failures: u64,
    pub sweeps: u64,
    pub restarted_cursors: u64,
    pub pages_served: u64,
    pub empty_pages: u64,
}
