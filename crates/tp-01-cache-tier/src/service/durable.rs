//! # Durable Tier
//!
//! Async facade over a blocking [`KeyValueStore`].
//!
//! Every call runs on the blocking pool under a caller-visible deadline; on
//! timeout the caller gets `StoreError::Timeout` and falls back per the
//! stampede protocol instead of waiting on the backend.
//!
//! ## Operations
//!
//! | Method | Semantics |
//! |--------|-----------|
//! | `get` | Live record or `None`; expired records read as missing |
//! | `set` | Unconditional write with the configured TTL |
//! | `add` | Write only if no live record exists |
//! | `incr` | Add to a decimal counter, creating it at 0 |
//! | `delete` | Remove; missing keys are fine |
//! | `purge_expired` | Remove expired records under a prefix |
//!
//! `add` and `incr` are read-modify-write; they are serialized within the
//! process by a single guard.

use crate::domain::{CacheError, CacheValue, DurableRecord};
use crate::ports::KeyValueStore;
use parking_lot::Mutex;
use shared_types::{StoreError, TimeSource, Timestamp};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Run a blocking store call on the blocking pool, giving up after `timeout`.
///
/// Shared by every component that persists through a [`KeyValueStore`]. A
/// timeout surfaces as `StoreError::Timeout`; the call itself keeps running
/// to completion in the background.
pub async fn call_with_deadline<T, E, F>(
    store: &Arc<dyn KeyValueStore>,
    timeout: Duration,
    op: &'static str,
    f: F,
) -> Result<T, E>
where
    T: Send + 'static,
    E: From<StoreError> + Send + 'static,
    F: FnOnce(&dyn KeyValueStore) -> Result<T, E> + Send + 'static,
{
    let store = Arc::clone(store);
    let task = tokio::task::spawn_blocking(move || f(store.as_ref()));
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join)) => Err(StoreError::Unavailable(format!("store {op} aborted: {join}")).into()),
        Err(_) => {
            let millis = timeout.as_millis() as u64;
            debug!(op, timeout_ms = millis, "Store call timed out");
            Err(StoreError::Timeout { millis }.into())
        }
    }
}

/// Like [`call_with_deadline`], but for writes made under a RecomputeLock.
///
/// A write that overruns `timeout` is logged and then awaited to completion,
/// so the caller never releases its lock while the write can still land. The
/// settled result is returned.
pub async fn call_to_completion<T, E, F>(
    store: &Arc<dyn KeyValueStore>,
    timeout: Duration,
    op: &'static str,
    f: F,
) -> Result<T, E>
where
    T: Send + 'static,
    E: From<StoreError> + Send + 'static,
    F: FnOnce(&dyn KeyValueStore) -> Result<T, E> + Send + 'static,
{
    let store = Arc::clone(store);
    let mut task = tokio::task::spawn_blocking(move || f(store.as_ref()));
    let joined = match tokio::time::timeout(timeout, &mut task).await {
        Ok(joined) => joined,
        Err(_) => {
            warn!(
                op,
                timeout_ms = timeout.as_millis() as u64,
                "Store write overran its deadline; waiting for it to settle"
            );
            task.await
        }
    };
    joined.unwrap_or_else(|join| Err(StoreError::Unavailable(format!("store {op} aborted: {join}")).into()))
}

pub struct DurableTier {
    store: Arc<dyn KeyValueStore>,
    time: Arc<dyn TimeSource>,
    timeout: Duration,
    ttl_ms: u64,
    rmw_guard: Arc<Mutex<()>>,
}

impl DurableTier {
    pub fn new(store: Arc<dyn KeyValueStore>, time: Arc<dyn TimeSource>, timeout: Duration, ttl_ms: u64) -> Self {
        Self {
            store,
            time,
            timeout,
            ttl_ms,
            rmw_guard: Arc::new(Mutex::new(())),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.store)
    }

    async fn run<T, F>(&self, op: &'static str, f: F) -> Result<T, CacheError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn KeyValueStore) -> Result<T, CacheError> + Send + 'static,
    {
        call_with_deadline(&self.store, self.timeout, op, f).await
    }

    fn expiry(&self, now: Timestamp) -> Timestamp {
        now.saturating_add(self.ttl_ms)
    }

    /// Live record for `key`.
    pub async fn get(&self, key: &str) -> Result<Option<DurableRecord>, CacheError> {
        let now = self.time.now();
        let key = key.to_string();
        self.run("get", move |store| {
            let Some(bytes) = store.get(key.as_bytes())? else {
                return Ok(None);
            };
            let record = DurableRecord::decode(&key, &bytes)?;
            Ok((!record.is_expired(now)).then_some(record))
        })
        .await
    }

    pub async fn set(&self, key: &str, value: CacheValue, generation: u64) -> Result<(), CacheError> {
        let record = DurableRecord::new(value, self.expiry(self.time.now()), generation);
        let bytes = record.encode()?;
        let key = key.to_string();
        self.run("set", move |store| Ok(store.put(key.as_bytes(), &bytes)?))
            .await
    }

    /// Insert only if absent (or expired). Returns whether the write happened.
    pub async fn add(&self, key: &str, value: CacheValue, generation: u64) -> Result<bool, CacheError> {
        let now = self.time.now();
        let record = DurableRecord::new(value, self.expiry(now), generation);
        let bytes = record.encode()?;
        let key = key.to_string();
        let guard = Arc::clone(&self.rmw_guard);
        self.run("add", move |store| {
            let _held = guard.lock();
            if let Some(existing) = store.get(key.as_bytes())? {
                let live = DurableRecord::decode(&key, &existing)
                    .map(|r| !r.is_expired(now))
                    .unwrap_or(false);
                if live {
                    return Ok(false);
                }
            }
            store.put(key.as_bytes(), &bytes)?;
            Ok(true)
        })
        .await
    }

    /// Add `delta` to the counter at `key` and return the new value.
    pub async fn incr(&self, key: &str, delta: i64, generation: u64) -> Result<i64, CacheError> {
        let now = self.time.now();
        let expires_at = self.expiry(now);
        let key = key.to_string();
        let guard = Arc::clone(&self.rmw_guard);
        self.run("incr", move |store| {
            let _held = guard.lock();
            let current = match store.get(key.as_bytes())? {
                Some(bytes) => {
                    let record = DurableRecord::decode(&key, &bytes)?;
                    if record.is_expired(now) {
                        0
                    } else {
                        record.counter(&key)?
                    }
                }
                None => 0,
            };
            let next = current.saturating_add(delta);
            let record = DurableRecord::new(
                CacheValue::Value(next.to_string().into_bytes()),
                expires_at,
                generation,
            );
            store.put(key.as_bytes(), &record.encode()?)?;
            Ok(next)
        })
        .await
    }

    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let key = key.to_string();
        self.run("delete", move |store| Ok(store.delete(key.as_bytes())?))
            .await
    }

    /// Remove expired records whose key starts with `prefix`. Undecodable
    /// records are left for inspection.
    pub async fn purge_expired(&self, prefix: &str) -> Result<usize, CacheError> {
        let now = self.time.now();
        let prefix = prefix.to_string();
        self.run("purge", move |store| {
            let mut removed = 0;
            for (key, bytes) in store.prefix_scan(prefix.as_bytes())? {
                let key_str = String::from_utf8_lossy(&key).to_string();
                let expired = DurableRecord::decode(&key_str, &bytes)
                    .map(|r| r.is_expired(now))
                    .unwrap_or(false);
                if expired {
                    store.delete(&key)?;
                    removed += 1;
                }
            }
            Ok(removed)
        })
        .await
    }
}
