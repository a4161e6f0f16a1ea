//! # Listing Index Service
//!
//! Rebuilds run under `lock:listing:{container}:{sort}:{window}` so the
//! generation read and the write of the next generation are never
//! interleaved between workers.

mod stats;

pub use stats::{ListingStats, ListingStatsSnapshot};

use crate::domain::{
    top_n, Cursor, DebounceTracker, Listing, ListingConfig, ListingError, ListingKey, ListingPage, SweepReport,
    Trigger,
};
use crate::ports::{CandidateSource, ListingApi};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_bus::{EventPublisher, PipelineEvent};
use shared_types::{keys, ItemAggregate, TimeSource};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tp_01_cache_tier::{call_to_completion, call_with_deadline, KeyValueStore, LockTier, RecomputeLock};
use tp_02_ranking::RankingApi;
use tracing::{debug, info, warn};

/// Dependencies for [`ListingIndex`].
pub struct ListingDependencies {
    pub store: Arc<dyn KeyValueStore>,
    pub locks: Arc<dyn LockTier>,
    pub candidates: Arc<dyn CandidateSource>,
    pub ranking: Arc<dyn RankingApi>,
    pub publisher: Arc<dyn EventPublisher>,
    pub time: Arc<dyn TimeSource>,
}

pub struct ListingIndex {
    store: Arc<dyn KeyValueStore>,
    locks: Arc<dyn LockTier>,
    candidates: Arc<dyn CandidateSource>,
    ranking: Arc<dyn RankingApi>,
    publisher: Arc<dyn EventPublisher>,
    time: Arc<dyn TimeSource>,
    config: ListingConfig,
    debounce: Mutex<DebounceTracker>,
    stats: ListingStats,
}

impl ListingIndex {
    pub fn new(deps: ListingDependencies, config: ListingConfig) -> Self {
        Self {
            store: deps.store,
            locks: deps.locks,
            candidates: deps.candidates,
            ranking: deps.ranking,
            publisher: deps.publisher,
            time: deps.time,
            debounce: Mutex::new(DebounceTracker::new(config.debounce_ms)),
            config,
            stats: ListingStats::default(),
        }
    }

    pub fn stats(&self) -> ListingStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn config(&self) -> &ListingConfig {
        &self.config
    }

    pub fn pending_count(&self) -> usize {
        self.debounce.lock().pending_count()
    }

    /// Invalidate several keys, continuing past failures. Returns how many
    /// were rebuilt immediately.
    pub async fn invalidate_many(&self, keys: &[ListingKey]) -> usize {
        let mut rebuilt = 0;
        for key in keys {
            match self.invalidate(*key).await {
                Ok(Trigger::Now) => rebuilt += 1,
                Ok(Trigger::Deferred) => {}
                Err(e) => warn!(listing = %key, error = %e, "Listing invalidation failed"),
            }
        }
        rebuilt
    }

    /// Keys this worker has touched plus every listing found in the store.
    pub async fn known_keys(&self) -> Vec<ListingKey> {
        let mut known: BTreeSet<ListingKey> = self.debounce.lock().known().into_iter().collect();
        let timeout = Duration::from_millis(self.config.store_timeout_ms);
        let scanned = call_with_deadline(&self.store, timeout, "scan_listings", |store| {
            store.prefix_scan(keys::LISTING_PREFIX.as_bytes())
        })
        .await;
        match scanned {
            Ok(entries) => known.extend(
                entries
                    .iter()
                    .filter_map(|(raw, _)| std::str::from_utf8(raw).ok())
                    .filter_map(ListingKey::parse_store_key),
            ),
            Err(e) => warn!(error = %e, "Listing scan failed; sweeping known keys only"),
        }
        known.into_iter().collect()
    }

    async fn rebuild_now(&self, key: ListingKey) -> Result<Listing, ListingError> {
        let lock = self.acquire(&keys::lock_key(&key.store_key())).await?;
        let result = self.build_locked(key).await;
        self.locks.release(&lock);
        let listing = result?;

        ListingStats::incr(&self.stats.rebuilds);
        info!(
            listing = %key,
            generation = listing.generation,
            items = listing.item_ids.len(),
            "Listing rebuilt"
        );
        self.publisher
            .publish(PipelineEvent::ListingRebuilt {
                container_id: key.container_id,
                sort: key.sort,
                window: key.window,
                generation: listing.generation,
                items: listing.item_ids.len(),
            })
            .await;
        Ok(listing)
    }

    async fn build_locked(&self, key: ListingKey) -> Result<Listing, ListingError> {
        let now = self.time.now();
        let previous = self.load(key).await?.map_or(0, |listing| listing.generation);
        let candidates = self
            .candidates
            .candidates(key.container_id, key.window.cutoff(now))
            .await?;

        let ranked = candidates.iter().map(|candidate| {
            let aggregate = candidate.aggregate.unwrap_or_else(|| {
                let empty = ItemAggregate::empty(candidate.item_id, candidate.created_at);
                self.ranking.recompute(&empty, 0, 0, candidate.created_at)
            });
            (candidate.item_id, self.ranking.rank_value(key.sort, &aggregate))
        });

        let listing = Listing {
            key,
            item_ids: top_n(ranked, self.config.max_items),
            generation: previous + 1,
            built_at: now,
        };
        self.save(&listing).await?;
        Ok(listing)
    }

    /// Request a rebuild of each key through the debounce.
    async fn run_keys(&self, keys: Vec<ListingKey>) -> SweepReport {
        let mut report = SweepReport::default();
        for key in keys {
            match self.invalidate(key).await {
                Ok(Trigger::Now) => report.rebuilt += 1,
                Ok(Trigger::Deferred) => report.deferred += 1,
                Err(_) => report.failed += 1,
            }
        }
        report
    }

    async fn acquire(&self, key: &str) -> Result<RecomputeLock, ListingError> {
        let attempts = self.config.lock_attempts.max(1);
        for attempt in 1..=attempts {
            if let Some(lock) = self.locks.try_acquire(key, self.config.lock_ttl_ms) {
                return Ok(lock);
            }
            if attempt < attempts {
                tokio::time::sleep(Duration::from_millis(self.config.lock_retry_ms)).await;
            }
        }
        Err(ListingError::LockContention {
            key: key.to_string(),
            attempts,
        })
    }

    /// Another worker holds the rebuild lock of a listing nobody has built
    /// yet. Give it a few lock retry intervals to store one.
    async fn wait_for_builder(&self, key: ListingKey) -> Result<Option<Listing>, ListingError> {
        for _ in 0..self.config.lock_attempts.max(1) {
            tokio::time::sleep(Duration::from_millis(self.config.lock_retry_ms)).await;
            if let Some(listing) = self.load(key).await? {
                return Ok(Some(listing));
            }
        }
        Ok(None)
    }

    async fn load(&self, key: ListingKey) -> Result<Option<Listing>, ListingError> {
        let store_key = key.store_key();
        let timeout = Duration::from_millis(self.config.store_timeout_ms);
        call_with_deadline(&self.store, timeout, "load_listing", move |store| {
            store
                .get(store_key.as_bytes())?
                .map(|bytes| Listing::decode(&store_key, &bytes))
                .transpose()
                .map_err(ListingError::from)
        })
        .await
    }

    /// Runs under the rebuild lock, so it waits out a slow write rather than
    /// let it land after the lock is gone.
    async fn save(&self, listing: &Listing) -> Result<(), ListingError> {
        let store_key = listing.key.store_key();
        let bytes = listing.encode()?;
        let timeout = Duration::from_millis(self.config.store_timeout_ms);
        call_to_completion(&self.store, timeout, "save_listing", move |store| {
            Ok(store.put(store_key.as_bytes(), &bytes)?)
        })
        .await
    }
}

#[async_trait]
impl ListingApi for ListingIndex {
    async fn get_listing_page(
        &self,
        key: ListingKey,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<ListingPage, ListingError> {
        let listing = match self.load(key).await? {
            Some(listing) => listing,
            None => match self.rebuild(key).await {
                Ok(listing) => listing,
                Err(ListingError::LockContention { .. }) => match self.wait_for_builder(key).await? {
                    Some(listing) => listing,
                    None => {
                        ListingStats::incr(&self.stats.empty_pages);
                        debug!(listing = %key, "Listing still being built elsewhere, serving an empty page");
                        return Ok(ListingPage {
                            item_ids: Vec::new(),
                            next_cursor: None,
                            generation: 0,
                            restarted: cursor.is_some_and(|raw| !raw.is_empty()),
                        });
                    }
                },
                Err(e) => return Err(e),
            },
        };

        let len = listing.item_ids.len();
        let (offset, restarted) = match cursor.filter(|raw| !raw.is_empty()) {
            None => (0, false),
            Some(raw) => match Cursor::decode(raw)
                .filter(|c| c.is_usable(listing.generation, len, self.config.max_generation_lag))
            {
                Some(c) => (c.offset, false),
                None => {
                    ListingStats::incr(&self.stats.restarted_cursors);
                    debug!(listing = %key, generation = listing.generation, "Cursor rejected, restarting");
                    (0, true)
                }
            },
        };

        let end = offset.saturating_add(self.config.page_size(page_size)).min(len);
        let next_cursor = (end < len).then(|| Cursor::new(listing.generation, end).encode());
        ListingStats::incr(&self.stats.pages_served);

        Ok(ListingPage {
            item_ids: listing.item_ids[offset..end].to_vec(),
            next_cursor,
            generation: listing.generation,
            restarted,
        })
    }

    async fn listing(&self, key: ListingKey) -> Result<Option<Listing>, ListingError> {
        self.load(key).await
    }

    async fn rebuild(&self, key: ListingKey) -> Result<Listing, ListingError> {
        let listing = self.rebuild_now(key).await?;
        self.debounce.lock().rebuilt(key, self.time.now());
        Ok(listing)
    }

    async fn invalidate(&self, key: ListingKey) -> Result<Trigger, ListingError> {
        let trigger = self.debounce.lock().request(key, self.time.now());
        if trigger == Trigger::Deferred {
            ListingStats::incr(&self.stats.deferred);
            debug!(listing = %key, "Listing rebuild deferred");
            return Ok(trigger);
        }

        if let Err(e) = self.rebuild_now(key).await {
            self.debounce.lock().mark_pending(key);
            ListingStats::incr(&self.stats.failures);
            warn!(listing = %key, error = %e, "Listing rebuild failed, left pending");
            return Err(e);
        }
        Ok(Trigger::Now)
    }

    async fn flush_pending(&self) -> SweepReport {
        let due = self.debounce.lock().due(self.time.now());
        if due.is_empty() {
            return SweepReport::default();
        }
        let report = self.run_keys(due).await;
        debug!(?report, "Pending listings flushed");
        report
    }

    async fn sweep(&self) -> SweepReport {
        let keys = self.known_keys().await;
        let report = self.run_keys(keys).await;
        ListingStats::incr(&self.stats.sweeps);
        info!(
            rebuilt = report.rebuilt,
            deferred = report.deferred,
            failed = report.failed,
            "Listing sweep complete"
        );
        report
    }
}
