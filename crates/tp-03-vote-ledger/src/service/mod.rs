//! # Vote Ledger Service
//!
//! Owns every `agg:` and `vote:` key. Aggregates are only written while the
//! item's RecomputeLock is held; everything else reads snapshots.

mod stats;

pub use stats::{LedgerStats, LedgerStatsSnapshot};

use crate::domain::{decode_aggregate, encode_aggregate, LedgerConfig, LedgerError, LedgerOutcome, StoredVote};
use crate::ports::{ItemDirectory, VoteLedgerApi};
use async_trait::async_trait;
use dashmap::DashMap;
use shared_bus::{EventPublisher, PipelineEvent};
use shared_types::{
    keys, ItemAggregate, ItemId, ItemInfo, StoreError, TimeSource, Timestamp, UserId, Vote, VoteDirection,
};
use std::sync::Arc;
use std::time::Duration;
use tp_01_cache_tier::{call_to_completion, call_with_deadline, BatchOperation, KeyValueStore, LockTier, RecomputeLock};
use tp_02_ranking::RankingApi;
use tracing::{debug, error, info};

/// Dependencies for [`VoteLedger`].
pub struct LedgerDependencies {
    pub store: Arc<dyn KeyValueStore>,
    pub locks: Arc<dyn LockTier>,
    pub directory: Arc<dyn ItemDirectory>,
    pub ranking: Arc<dyn RankingApi>,
    pub publisher: Arc<dyn EventPublisher>,
    pub time: Arc<dyn TimeSource>,
}

/// Why an item was quarantined, and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuarantineRecord {
    pub reason: String,
    pub since: Timestamp,
}

pub struct VoteLedger {
    store: Arc<dyn KeyValueStore>,
    locks: Arc<dyn LockTier>,
    directory: Arc<dyn ItemDirectory>,
    ranking: Arc<dyn RankingApi>,
    publisher: Arc<dyn EventPublisher>,
    time: Arc<dyn TimeSource>,
    config: LedgerConfig,
    quarantine: DashMap<ItemId, QuarantineRecord>,
    stats: LedgerStats,
}

impl VoteLedger {
    pub fn new(deps: LedgerDependencies, config: LedgerConfig) -> Self {
        Self {
            store: deps.store,
            locks: deps.locks,
            directory: deps.directory,
            ranking: deps.ranking,
            publisher: deps.publisher,
            time: deps.time,
            config,
            quarantine: DashMap::new(),
            stats: LedgerStats::default(),
        }
    }

    pub fn stats(&self) -> LedgerStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn is_quarantined(&self, item_id: ItemId) -> bool {
        self.quarantine.contains_key(&item_id)
    }

    /// Currently quarantined items with their reasons.
    pub fn quarantined(&self) -> Vec<(ItemId, QuarantineRecord)> {
        let mut items: Vec<_> = self
            .quarantine
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        items.sort_by_key(|(id, _)| *id);
        items
    }

    /// Lift the quarantine on `item_id` after an operator repaired it.
    pub fn release_quarantine(&self, item_id: ItemId) -> bool {
        let released = self.quarantine.remove(&item_id).is_some();
        if released {
            info!(item_id = %item_id, "Quarantine lifted");
        }
        released
    }

    /// Snapshots of several aggregates. Items never voted on are omitted.
    pub async fn aggregates(&self, item_ids: &[ItemId]) -> Result<Vec<ItemAggregate>, LedgerError> {
        let keys: Vec<String> = item_ids.iter().map(|id| keys::aggregate_key(*id)).collect();
        self.store_call("multi_get", move |store| {
            let mut found = Vec::with_capacity(keys.len());
            for key in &keys {
                if let Some(bytes) = store.get(key.as_bytes())? {
                    found.push(decode_aggregate(key, &bytes)?);
                }
            }
            Ok(found)
        })
        .await
    }

    async fn store_call<T, F>(&self, op: &'static str, f: F) -> Result<T, LedgerError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn KeyValueStore) -> Result<T, LedgerError> + Send + 'static,
    {
        let timeout = Duration::from_millis(self.config.store_timeout_ms);
        call_with_deadline(&self.store, timeout, op, f).await
    }

    async fn acquire(&self, key: &str) -> Result<RecomputeLock, LedgerError> {
        let attempts = self.config.lock_attempts.max(1);
        for attempt in 1..=attempts {
            if let Some(lock) = self.locks.try_acquire(key, self.config.lock_ttl_ms) {
                return Ok(lock);
            }
            LedgerStats::incr(&self.stats.lock_retries);
            if attempt < attempts {
                tokio::time::sleep(Duration::from_millis(self.config.lock_retry_ms)).await;
            }
        }
        Err(LedgerError::LockContention {
            key: key.to_string(),
            attempts,
        })
    }

    /// Body of `apply_vote`; runs with the item lock held.
    async fn apply_locked(&self, vote: &Vote, info: &ItemInfo) -> Result<LedgerOutcome, LedgerError> {
        let agg_key = keys::aggregate_key(vote.item_id);
        let vote_key = keys::vote_key(vote.item_id, vote.voter_id);

        let (stored_vote, stored_agg) = {
            let (agg_key, vote_key) = (agg_key.clone(), vote_key.clone());
            self.store_call("read", move |store| {
                Ok((store.get(vote_key.as_bytes())?, store.get(agg_key.as_bytes())?))
            })
            .await?
        };

        let previous = match stored_vote {
            Some(bytes) => StoredVote::decode(&vote_key, &bytes)?.direction,
            None => VoteDirection::None,
        };
        if previous == vote.direction {
            return Ok(LedgerOutcome::NoOp);
        }

        let old = match stored_agg {
            Some(bytes) => {
                let agg = decode_aggregate(&agg_key, &bytes).map_err(|e| corrupt(vote.item_id, e.to_string()))?;
                self.verify(vote.item_id, &agg)?;
                agg
            }
            None => self.ranking.recompute(
                &ItemAggregate::empty(vote.item_id, info.created_at),
                0,
                0,
                info.created_at,
            ),
        };

        let (prev_ups, prev_downs) = previous.counts();
        let (next_ups, next_downs) = vote.direction.counts();
        let ups = old
            .ups
            .checked_sub(prev_ups)
            .ok_or_else(|| corrupt(vote.item_id, "ups underflow"))?
            + next_ups;
        let downs = old
            .downs
            .checked_sub(prev_downs)
            .ok_or_else(|| corrupt(vote.item_id, "downs underflow"))?
            + next_downs;

        let new = self.ranking.recompute(&old, ups, downs, self.time.now());
        let record = StoredVote {
            direction: vote.direction,
            submitted_at: vote.submitted_at,
        };
        let batch = vec![
            BatchOperation::put(vote_key.clone().into_bytes(), record.encode(&vote_key)?),
            BatchOperation::put(agg_key.clone().into_bytes(), encode_aggregate(&agg_key, &new)?),
        ];
        // The lock must outlive the write, or a later vote could read the old
        // aggregate and be overwritten when this write lands.
        let timeout = Duration::from_millis(self.config.store_timeout_ms);
        call_to_completion(&self.store, timeout, "batch_write", move |store| {
            Ok::<_, LedgerError>(store.atomic_batch_write(batch)?)
        })
        .await?;

        Ok(LedgerOutcome::Applied {
            old,
            new,
            previous_direction: previous,
        })
    }

    fn verify(&self, item_id: ItemId, agg: &ItemAggregate) -> Result<(), LedgerError> {
        if agg.item_id != item_id {
            return Err(corrupt(item_id, format!("aggregate belongs to item {}", agg.item_id)));
        }
        if !self.ranking.is_consistent(agg) {
            return Err(corrupt(item_id, "derived ranks disagree with vote totals"));
        }
        Ok(())
    }

    async fn quarantine(&self, item_id: ItemId, reason: &str) {
        self.quarantine.insert(
            item_id,
            QuarantineRecord {
                reason: reason.to_string(),
                since: self.time.now(),
            },
        );
        LedgerStats::incr(&self.stats.quarantined);
        error!(item_id = %item_id, reason, "Aggregate quarantined");
        self.publisher
            .publish(PipelineEvent::AggregateQuarantined {
                item_id,
                reason: reason.to_string(),
            })
            .await;
    }
}

#[async_trait]
impl VoteLedgerApi for VoteLedger {
    async fn apply_vote(&self, vote: &Vote) -> Result<LedgerOutcome, LedgerError> {
        if self.is_quarantined(vote.item_id) {
            LedgerStats::incr(&self.stats.rejected);
            return Err(LedgerError::Quarantined(vote.item_id));
        }
        let Some(info) = self.directory.item_info(vote.item_id).await? else {
            LedgerStats::incr(&self.stats.rejected);
            return Err(LedgerError::ItemNotFound(vote.item_id));
        };

        let lock = self.acquire(&keys::lock_key(&keys::aggregate_key(vote.item_id))).await?;
        let result = self.apply_locked(vote, &info).await;
        self.locks.release(&lock);

        match &result {
            Ok(LedgerOutcome::Applied {
                new,
                previous_direction,
                ..
            }) => {
                LedgerStats::incr(&self.stats.applied);
                debug!(
                    item_id = %vote.item_id,
                    voter_id = %vote.voter_id,
                    direction = %vote.direction,
                    previous = %previous_direction,
                    score = new.score,
                    "Vote applied"
                );
                self.publisher
                    .publish(PipelineEvent::VoteApplied {
                        item_id: vote.item_id,
                        voter_id: vote.voter_id,
                        direction: vote.direction,
                        previous: *previous_direction,
                        ups: new.ups,
                        downs: new.downs,
                        score: new.score,
                        hot_rank: new.hot_rank,
                    })
                    .await;
            }
            Ok(LedgerOutcome::NoOp) => {
                LedgerStats::incr(&self.stats.noops);
                debug!(item_id = %vote.item_id, voter_id = %vote.voter_id, "Duplicate vote ignored");
                self.publisher
                    .publish(PipelineEvent::VoteNoOp {
                        item_id: vote.item_id,
                        voter_id: vote.voter_id,
                    })
                    .await;
            }
            Err(LedgerError::CorruptAggregate { item_id, reason }) => {
                self.quarantine(*item_id, reason).await;
            }
            Err(LedgerError::Store(e @ StoreError::Codec { .. })) => {
                // An undecodable vote record is as unusable as a bad aggregate.
                self.quarantine(vote.item_id, &e.to_string()).await;
                return Err(LedgerError::CorruptAggregate {
                    item_id: vote.item_id,
                    reason: e.to_string(),
                });
            }
            Err(_) => {}
        }
        result
    }

    async fn aggregate(&self, item_id: ItemId) -> Result<Option<ItemAggregate>, LedgerError> {
        let key = keys::aggregate_key(item_id);
        self.store_call("get_aggregate", move |store| {
            store
                .get(key.as_bytes())?
                .map(|bytes| decode_aggregate(&key, &bytes))
                .transpose()
                .map_err(LedgerError::from)
        })
        .await
    }

    async fn stored_direction(&self, item_id: ItemId, voter_id: UserId) -> Result<VoteDirection, LedgerError> {
        let key = keys::vote_key(item_id, voter_id);
        self.store_call("get_vote", move |store| {
            Ok(store
                .get(key.as_bytes())?
                .map(|bytes| StoredVote::decode(&key, &bytes))
                .transpose()?
                .map_or(VoteDirection::None, |stored| stored.direction))
        })
        .await
    }
}

/// The quarantine itself is recorded by `apply_vote` once the lock is released.
fn corrupt(item_id: ItemId, reason: impl Into<String>) -> LedgerError {
    LedgerError::CorruptAggregate {
        item_id,
        reason: reason.into(),
    }
}
