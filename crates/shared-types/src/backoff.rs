//! Retry delays shared by pool restarts, message redelivery and failed tree
//! passes.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exponential backoff with a cap and proportional jitter.
///
/// Attempt `n` (1-based) waits `base_ms * multiplier^(n-1)`, capped at
/// `max_ms`, then shortened by a random fraction of up to `jitter` so
/// workers that hit the same outage do not retry in lockstep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffPolicy {
    pub base_ms: u64,
    pub max_ms: u64,
    pub multiplier: f64,
    /// Fraction in `[0, 1]`.
    pub jitter: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_ms: 500,
            max_ms: 30_000,
            multiplier: 2.0,
            jitter: 0.2,
        }
    }
}

impl BackoffPolicy {
    pub fn for_testing() -> Self {
        Self {
            base_ms: 10,
            max_ms: 40,
            multiplier: 2.0,
            jitter: 0.0,
        }
    }

    /// Upper bound of the delay before retry `attempt`.
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let raw = self.base_ms as f64 * self.multiplier.max(1.0).powi(exponent);
        let capped = raw.min(self.max_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    /// Jittered delay from the thread-local generator.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        self.delay(attempt, &mut rand::thread_rng())
    }

    pub fn delay<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let ceiling = self.ceiling(attempt);
        let jitter = self.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 || ceiling.is_zero() {
            return ceiling;
        }
        let cut: f64 = rng.gen_range(0.0..=jitter);
        ceiling.mul_f64(1.0 - cut)
    }
}
