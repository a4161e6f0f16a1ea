//! # Cache Manager
//!
//! Coordinates the four tiers and implements the stampede protocol.
//!
//! ## Read path (`get_or_compute`)
//!
//! ```text
//! volatile ──hit──────────────────────────────────────────────► Cached
//!    │ miss (placeholders count as misses)
//!    ▼
//! durable (policy.durable) ──hit──► repopulate volatile ──────► Cached
//!    │ miss
//!    ▼
//! try lock ──acquired──► compute ──► durable? + volatile + stale ► Fresh
//!    │ contended
//!    ▼
//! stale ──hit─────────────────────────────────────────────────► Stale
//!    │ miss
//!    ▼
//! poll volatile / lock until lock_wait ──► value | acquire | compute anyway
//! ```
//!
//! A failed compute degrades to the stale copy or a placeholder. Readers
//! never see an error.

use super::durable::DurableTier;
use super::metrics::{CacheMetrics, CacheStats};
use crate::adapters::{InMemoryLockTier, LruCacheStore};
use crate::domain::{
    CacheConfig, CacheEntry, CacheError, CachePolicy, CacheValue, Fetched, Freshness,
    RecomputeLock, Tier,
};
use crate::ports::{CacheInvalidation, CacheStore, KeyValueStore, LockTier};
use async_trait::async_trait;
use shared_types::{keys, TimeSource};
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of waiting on another worker's recomputation.
enum Waited {
    Value(Fetched),
    Acquired(RecomputeLock),
    TimedOut,
}

/// Counts of entries removed by [`CacheManager::purge_expired`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub volatile: usize,
    pub stale: usize,
    pub locks: usize,
}

pub struct CacheManager {
    config: CacheConfig,
    locks: Arc<dyn LockTier>,
    durable: DurableTier,
    volatile: Arc<dyn CacheStore>,
    stale: Arc<dyn CacheStore>,
    time: Arc<dyn TimeSource>,
    generation: AtomicU64,
    metrics: CacheMetrics,
}

impl CacheManager {
    /// In-memory lock, volatile and stale tiers over the given durable store.
    pub fn new(
        config: CacheConfig,
        durable_store: Arc<dyn KeyValueStore>,
        time: Arc<dyn TimeSource>,
    ) -> Result<Self, CacheError> {
        let locks = Arc::new(InMemoryLockTier::new(Arc::clone(&time)));
        let volatile = Arc::new(LruCacheStore::new(config.volatile_capacity));
        let stale = Arc::new(LruCacheStore::new(config.stale_capacity));
        Self::with_tiers(config, locks, durable_store, volatile, stale, time)
    }

    /// Fully explicit tier wiring.
    pub fn with_tiers(
        config: CacheConfig,
        locks: Arc<dyn LockTier>,
        durable_store: Arc<dyn KeyValueStore>,
        volatile: Arc<dyn CacheStore>,
        stale: Arc<dyn CacheStore>,
        time: Arc<dyn TimeSource>,
    ) -> Result<Self, CacheError> {
        config.validate()?;
        let durable = DurableTier::new(
            durable_store,
            Arc::clone(&time),
            Duration::from_millis(config.durable_timeout_ms),
            config.durable_ttl_ms,
        );
        Ok(Self {
            config,
            locks,
            durable,
            volatile,
            stale,
            time,
            generation: AtomicU64::new(0),
            metrics: CacheMetrics::new(),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Return the cached value for `key`, computing it at most once across
    /// concurrent callers.
    pub async fn get_or_compute<F, Fut, E>(&self, key: &str, policy: CachePolicy, compute: F) -> Fetched
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, E>>,
        E: Display,
    {
        if let Some(hit) = self.read_volatile(key) {
            return hit;
        }
        if policy.durable {
            if let Some(hit) = self.read_durable(key).await {
                return hit;
            }
        }
        CacheMetrics::incr(&self.metrics.misses);

        let lock_key = keys::lock_key(key);
        let lock = match self.locks.try_acquire(&lock_key, self.config.lock_ttl_ms) {
            Some(lock) => {
                // The previous holder may have finished between our read and
                // the acquire.
                if let Some(hit) = self.read_volatile(key) {
                    self.locks.release(&lock);
                    return hit;
                }
                Some(lock)
            }
            None => {
                CacheMetrics::incr(&self.metrics.lock_contention);
                if let Some(stale) = self.read_stale(key) {
                    return stale;
                }
                match self.wait_for_holder(key, &lock_key).await {
                    Waited::Value(hit) => return hit,
                    Waited::Acquired(lock) => Some(lock),
                    Waited::TimedOut => {
                        CacheMetrics::incr(&self.metrics.lock_wait_timeouts);
                        warn!(key, wait_ms = self.config.lock_wait_ms, "Lock wait expired, computing without lock");
                        None
                    }
                }
            }
        };

        self.compute_and_store(key, policy, lock, compute).await
    }

    /// Fire-and-forget population.
    ///
    /// On a miss a `Placeholder` is written to the volatile tier, the
    /// computation is spawned under the key's lock, and the caller gets the
    /// stale copy if one exists or a placeholder otherwise.
    pub async fn get_or_placeholder<F, Fut, E>(self: &Arc<Self>, key: &str, policy: CachePolicy, compute: F) -> Fetched
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Vec<u8>, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        if let Some(hit) = self.read_volatile(key) {
            return hit;
        }
        if policy.durable {
            if let Some(hit) = self.read_durable(key).await {
                return hit;
            }
        }

        let lock_key = keys::lock_key(key);
        match self.locks.try_acquire(&lock_key, self.config.lock_ttl_ms) {
            Some(lock) => {
                let now = self.time.now();
                self.volatile.set(CacheEntry {
                    key: key.to_string(),
                    value: CacheValue::Placeholder,
                    tier: Tier::Volatile,
                    ttl_ms: self.config.lock_ttl_ms,
                    write_generation: self.next_generation(),
                    written_at: now,
                });
                debug!(key, "Placeholder written, computing in background");

                let this = Arc::clone(self);
                let owned_key = key.to_string();
                tokio::spawn(async move {
                    this.compute_and_store(&owned_key, policy, Some(lock), compute)
                        .await;
                });
            }
            None => CacheMetrics::incr(&self.metrics.lock_contention),
        }

        self.read_stale(key).unwrap_or_else(|| self.placeholder())
    }

    /// Write a value through every tier the policy names, without locking.
    pub async fn put(&self, key: &str, policy: CachePolicy, bytes: Vec<u8>) {
        self.store(key, policy, bytes).await;
    }

    /// Volatile-tier contents for `key`, placeholders included.
    pub fn peek(&self, key: &str) -> Option<CacheValue> {
        self.volatile
            .get(key, self.time.now())
            .map(|entry| entry.value)
    }

    /// Durable insert-if-absent.
    pub async fn add(&self, key: &str, bytes: Vec<u8>) -> Result<bool, CacheError> {
        self.durable
            .add(key, CacheValue::Value(bytes), self.next_generation())
            .await
    }

    /// Durable counter increment.
    pub async fn incr(&self, key: &str, delta: i64) -> Result<i64, CacheError> {
        let value = self.durable.incr(key, delta, self.next_generation()).await?;
        self.volatile.remove(key);
        Ok(value)
    }

    /// Sweep expired entries from the in-memory tiers and the lock tier.
    pub fn purge_expired(&self) -> PurgeReport {
        let now = self.time.now();
        PurgeReport {
            volatile: self.volatile.purge_expired(now),
            stale: self.stale.purge_expired(now),
            locks: self.locks.purge_expired(),
        }
    }

    /// Remove expired durable records under `prefix`.
    pub async fn purge_durable(&self, prefix: &str) -> Result<usize, CacheError> {
        self.durable.purge_expired(prefix).await
    }

    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot(
            self.volatile.stats(),
            self.stale.stats(),
            self.locks.held_count(),
        )
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn placeholder(&self) -> Fetched {
        CacheMetrics::incr(&self.metrics.placeholders);
        Fetched::placeholder()
    }

    fn read_volatile(&self, key: &str) -> Option<Fetched> {
        let entry = self.volatile.get(key, self.time.now())?;
        if entry.value.is_placeholder() {
            return None;
        }
        CacheMetrics::incr(&self.metrics.volatile_hits);
        Some(Fetched::new(entry.value, Freshness::Cached))
    }

    fn read_stale(&self, key: &str) -> Option<Fetched> {
        let entry = self.stale.get(key, self.time.now())?;
        if entry.value.is_placeholder() {
            return None;
        }
        CacheMetrics::incr(&self.metrics.stale_serves);
        debug!(key, generation = entry.write_generation, "Serving stale value");
        Some(Fetched::new(entry.value, Freshness::Stale))
    }

    async fn read_durable(&self, key: &str) -> Option<Fetched> {
        match self.durable.get(key).await {
            Ok(Some(record)) if !record.value.is_placeholder() => {
                CacheMetrics::incr(&self.metrics.durable_hits);
                let now = self.time.now();
                self.volatile.set(CacheEntry {
                    key: key.to_string(),
                    value: record.value.clone(),
                    tier: Tier::Volatile,
                    ttl_ms: self.config.volatile_ttl_ms,
                    write_generation: record.write_generation,
                    written_at: now,
                });
                Some(Fetched::new(record.value, Freshness::Cached))
            }
            Ok(_) => None,
            Err(e) => {
                CacheMetrics::incr(&self.metrics.durable_errors);
                warn!(key, error = %e, "Durable tier read failed");
                None
            }
        }
    }

    async fn wait_for_holder(&self, key: &str, lock_key: &str) -> Waited {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(self.config.lock_wait_ms);
        let poll = Duration::from_millis(self.config.lock_poll_ms);
        loop {
            tokio::time::sleep(poll).await;
            if let Some(hit) = self.read_volatile(key) {
                return Waited::Value(hit);
            }
            if let Some(lock) = self.locks.try_acquire(lock_key, self.config.lock_ttl_ms) {
                if let Some(hit) = self.read_volatile(key) {
                    self.locks.release(&lock);
                    return Waited::Value(hit);
                }
                return Waited::Acquired(lock);
            }
            if tokio::time::Instant::now() >= deadline {
                return Waited::TimedOut;
            }
        }
    }

    async fn compute_and_store<F, Fut, E>(
        &self,
        key: &str,
        policy: CachePolicy,
        lock: Option<RecomputeLock>,
        compute: F,
    ) -> Fetched
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, E>>,
        E: Display,
    {
        let fetched = match compute().await {
            Ok(bytes) => {
                CacheMetrics::incr(&self.metrics.computes);
                self.store(key, policy, bytes.clone()).await;
                Fetched::new(CacheValue::Value(bytes), Freshness::Fresh)
            }
            Err(e) => {
                CacheMetrics::incr(&self.metrics.compute_failures);
                let error = CacheError::compute(key, e.to_string());
                warn!(key, error = %error, "Fragment computation failed");
                if self
                    .volatile
                    .get(key, self.time.now())
                    .is_some_and(|entry| entry.value.is_placeholder())
                {
                    self.volatile.remove(key);
                }
                self.read_stale(key).unwrap_or_else(|| self.placeholder())
            }
        };
        if let Some(lock) = lock {
            if !self.locks.release(&lock) {
                debug!(key, "Lock expired before release");
            }
        }
        fetched
    }

    async fn store(&self, key: &str, policy: CachePolicy, bytes: Vec<u8>) {
        let now = self.time.now();
        let generation = self.next_generation();
        let value = CacheValue::Value(bytes);

        if policy.durable {
            if let Err(e) = self.durable.set(key, value.clone(), generation).await {
                CacheMetrics::incr(&self.metrics.durable_errors);
                warn!(key, error = %e, "Durable tier write failed");
            }
        }

        let entry = CacheEntry {
            key: key.to_string(),
            value,
            tier: Tier::Volatile,
            ttl_ms: policy.volatile_ttl_ms.unwrap_or(self.config.volatile_ttl_ms),
            write_generation: generation,
            written_at: now,
        };
        self.stale
            .set(entry.mirrored(Tier::Stale, self.config.stale_ttl_ms, now));
        self.volatile.set(entry);
    }
}

#[async_trait]
impl CacheInvalidation for CacheManager {
    async fn invalidate(&self, key: &str, durable: bool) {
        CacheMetrics::incr(&self.metrics.invalidations);
        self.volatile.remove(key);
        if durable {
            if let Err(e) = self.durable.delete(key).await {
                CacheMetrics::incr(&self.metrics.durable_errors);
                warn!(key, error = %e, "Durable tier delete failed");
            }
        }
    }

    async fn mark_stale(&self, key: &str) {
        CacheMetrics::incr(&self.metrics.invalidations);
        let now = self.time.now();
        let demoted = match self.volatile.remove(key) {
            Some(entry) => Some(entry).filter(|entry| !entry.value.is_placeholder()),
            None => match self.durable.get(key).await {
                Ok(record) => record
                    .filter(|record| !record.value.is_placeholder())
                    .map(|record| CacheEntry {
                        key: key.to_string(),
                        value: record.value,
                        tier: Tier::Volatile,
                        ttl_ms: self.config.volatile_ttl_ms,
                        write_generation: record.write_generation,
                        written_at: now,
                    }),
                Err(e) => {
                    CacheMetrics::incr(&self.metrics.durable_errors);
                    warn!(key, error = %e, "Durable tier read failed");
                    None
                }
            },
        };
        if let Some(entry) = demoted {
            self.stale
                .set(entry.mirrored(Tier::Stale, self.config.stale_ttl_ms, now));
        }

        // A durable copy would be served as current on the next read.
        if let Err(e) = self.durable.delete(key).await {
            CacheMetrics::incr(&self.metrics.durable_errors);
            warn!(key, error = %e, "Durable tier delete failed");
        }
    }
}
