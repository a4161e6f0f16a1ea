//! Per-key rebuild rate limiting.
//!
//! A key may be rebuilt at most once per interval, whatever asked for it.
//! Requests inside the interval only mark the key pending. A key that is
//! neither pending nor inside its interval carries no state and is dropped
//! on the next `due`.

use super::listing::ListingKey;
use shared_types::Timestamp;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Rebuild now; the slot has been reserved.
    Now,
    /// Rebuilt too recently; the key is pending.
    Deferred,
}

#[derive(Debug, Clone, Copy, Default)]
struct KeyState {
    last_rebuild: Option<Timestamp>,
    pending: bool,
}

impl KeyState {
    fn elapsed(&self, interval_ms: u64, now: Timestamp) -> bool {
        self.last_rebuild
            .map_or(true, |at| now >= at.saturating_add(interval_ms))
    }
}

#[derive(Debug)]
pub struct DebounceTracker {
    interval_ms: u64,
    keys: BTreeMap<ListingKey, KeyState>,
}

impl DebounceTracker {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            keys: BTreeMap::new(),
        }
    }

    pub fn request(&mut self, key: ListingKey, now: Timestamp) -> Trigger {
        let interval = self.interval_ms;
        let state = self.keys.entry(key).or_default();
        if state.elapsed(interval, now) {
            state.last_rebuild = Some(now);
            state.pending = false;
            Trigger::Now
        } else {
            state.pending = true;
            Trigger::Deferred
        }
    }

    /// Record a completed rebuild that did not go through `request`.
    pub fn rebuilt(&mut self, key: ListingKey, now: Timestamp) {
        let state = self.keys.entry(key).or_default();
        state.last_rebuild = Some(now);
        state.pending = false;
    }

    /// Put a key back in the pending set after a failed rebuild.
    pub fn mark_pending(&mut self, key: ListingKey) {
        self.keys.entry(key).or_default().pending = true;
    }

    /// Pending keys whose interval has elapsed.
    pub fn due(&mut self, now: Timestamp) -> Vec<ListingKey> {
        let interval = self.interval_ms;
        self.keys
            .retain(|_, state| state.pending || !state.elapsed(interval, now));
        self.keys
            .iter()
            .filter(|(_, state)| state.pending && state.elapsed(interval, now))
            .map(|(key, _)| *key)
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.keys.values().filter(|s| s.pending).count()
    }

    /// Keys still tracked: pending, or rebuilt within the interval.
    pub fn known(&self) -> Vec<ListingKey> {
        self.keys.keys().copied().collect()
    }
}
