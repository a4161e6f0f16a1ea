//! Time source abstraction.
//!
//! Ranking depends on wall-clock age and every TTL in the cache tiers is
//! measured against it, so components take a `TimeSource` instead of calling
//! the system clock directly.

use crate::entities::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of the current time in milliseconds.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}

/// Manually driven clock for tests and replay tooling.
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    time: AtomicU64,
}

impl ManualTimeSource {
    pub fn new(initial: Timestamp) -> Self {
        Self {
            time: AtomicU64::new(initial),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.time.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, time: Timestamp) {
        self.time.store(time, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Timestamp {
        self.time.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_time_source() {
        // Jan 1, 2020 in ms
        assert!(SystemTimeSource.now() > 1_577_836_800_000);
    }

    #[test]
    fn test_manual_time_source() {
        let source = ManualTimeSource::new(1000);
        assert_eq!(source.now(), 1000);

        source.advance(500);
        assert_eq!(source.now(), 1500);

        source.set(3000);
        assert_eq!(source.now(), 3000);
    }
}
