use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct SupervisorStats {
    /// Consumer generations spawned, including the first of each pool.
    pub generations: AtomicU64,
    pub restarts: AtomicU64,
    pub monitor_passes: AtomicU64,
    pub backpressure_engaged: AtomicU64,
}

impl SupervisorStats {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SupervisorStatsSnapshot {
        SupervisorStatsSnapshot {
            generations: self.generations.load(Ordering::Relaxed),
            restarts: self.restarts.load(Ordering::Relaxed),
            monitor_passes: self.monitor_passes.load(Ordering::Relaxed),
            backpressure_engaged: self.backpressure_engaged.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupervisorStatsSnapshot {
    pub generations: u64,
    pub restarts: u64,
    pub monitor_passes: u64,
    pub backpressure_engaged: u64,
}
