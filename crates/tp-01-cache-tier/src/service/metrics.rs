//! Cache tier counters.
//!
//! Plain atomics so the tier has no dependency on the exporter; the worker
//! runtime copies [`CacheStats`] snapshots into Prometheus.

use crate::domain::LruStats;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for the stampede protocol.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    /// Reads answered by the volatile tier
    pub volatile_hits: AtomicU64,
    /// Reads answered by the durable tier
    pub durable_hits: AtomicU64,
    /// Reads that missed every data tier
    pub misses: AtomicU64,
    /// Stale values served (contention or failed compute)
    pub stale_serves: AtomicU64,
    /// Placeholders returned
    pub placeholders: AtomicU64,
    /// Successful computations
    pub computes: AtomicU64,
    /// Failed computations
    pub compute_failures: AtomicU64,
    /// Lock acquisitions lost to another holder
    pub lock_contention: AtomicU64,
    /// Bounded waits that expired before a value appeared
    pub lock_wait_timeouts: AtomicU64,
    /// `invalidate` and `mark_stale` calls
    pub invalidations: AtomicU64,
    /// Durable tier calls that failed or timed out
    pub durable_errors: AtomicU64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, volatile: LruStats, stale: LruStats, locks_held: usize) -> CacheStats {
        CacheStats {
            volatile_hits: self.volatile_hits.load(Ordering::Relaxed),
            durable_hits: self.durable_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale_serves: self.stale_serves.load(Ordering::Relaxed),
            placeholders: self.placeholders.load(Ordering::Relaxed),
            computes: self.computes.load(Ordering::Relaxed),
            compute_failures: self.compute_failures.load(Ordering::Relaxed),
            lock_contention: self.lock_contention.load(Ordering::Relaxed),
            lock_wait_timeouts: self.lock_wait_timeouts.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            durable_errors: self.durable_errors.load(Ordering::Relaxed),
            volatile,
            stale,
            locks_held,
        }
    }
}

/// Point-in-time view of the cache tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub volatile_hits: u64,
    pub durable_hits: u64,
    pub misses: u64,
    pub stale_serves: u64,
    pub placeholders: u64,
    pub computes: u64,
    pub compute_failures: u64,
    pub lock_contention: u64,
    pub lock_wait_timeouts: u64,
    pub invalidations: u64,
    pub durable_errors: u64,
    pub volatile: LruStats,
    pub stale: LruStats,
    pub locks_held: usize,
}

impl CacheStats {
    /// Fraction of reads served without computing.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.volatile_hits + self.durable_hits;
        let total = hits + self.misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}
