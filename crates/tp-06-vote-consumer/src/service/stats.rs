use std::sync::atomic::{AtomicU64, Ordering};

/// Dispatch outcomes of a [`super::VoteConsumer`].
#[derive(Debug, Default)]
pub struct ConsumerStats {
    pub votes_applied: AtomicU64,
    pub votes_noop: AtomicU64,
    pub votes_rejected: AtomicU64,
    pub quarantined: AtomicU64,
    pub maintenance: AtomicU64,
    /// Fan-out steps that failed after a successful ledger write.
    pub fanout_failures: AtomicU64,
}

impl ConsumerStats {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ConsumerStatsSnapshot {
        ConsumerStatsSnapshot {
            votes_applied: self.votes_applied.load(Ordering::Relaxed),
            votes_noop: self.votes_noop.load(Ordering::Relaxed),
            votes_rejected: self.votes_rejected.load(Ordering::Relaxed),
            quarantined: self.quarantined.load(Ordering::Relaxed),
            maintenance: self.maintenance.load(Ordering::Relaxed),
            fanout_failures: self.fanout_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStatsSnapshot {
    pub votes_applied: u64,
    pub votes_noop: u64,
    pub votes_rejected: u64,
    pub quarantined: u64,
    pub maintenance: u64,
    pub fanout_failures: u64,
}

/// Delivery outcomes of one queue, shared by every consumer of its pool.
#[derive(Debug, Default)]
pub struct DeliveryStats {
    pub received: AtomicU64,
    pub acked: AtomicU64,
    pub requeued: AtomicU64,
    pub dead_lettered: AtomicU64,
}

impl DeliveryStats {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DeliveryStatsSnapshot {
        DeliveryStatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            acked: self.acked.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
            dead_lettered: self.dead_lettered.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStatsSnapshot {
    pub received: u64,
    pub acked: u64,
    pub requeued: u64,
    pub dead_lettered: u64,
}
