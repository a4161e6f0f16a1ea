//! # Vote Consumer Service
//!
//! [`VoteConsumer`] turns one decoded delivery into pipeline calls and a
//! [`Disposition`]. [`ConsumerLoop`] owns the queue side.

mod consumer;
mod stats;

pub use consumer::{ConsumerLoop, LoopExit};
pub use stats::{ConsumerStats, ConsumerStatsSnapshot, DeliveryStats, DeliveryStatsSnapshot};

use crate::domain::{ConsumerConfig, ConsumerError, Disposition, QueueMessage};
use crate::ports::{Delivery, MessageHandler};
use async_trait::async_trait;
use shared_bus::{Component, EventPublisher, PipelineEvent};
use shared_types::{keys, Classify, ErrorClass, ItemId, ItemInfo, QueueEnvelope, Vote};
use std::sync::Arc;
use tippr_telemetry::{log_vote_event, metric_inc, metrics};
use tp_01_cache_tier::CacheInvalidation;
use tp_03_vote_ledger::{ItemDirectory, LedgerOutcome, VoteLedgerApi};
use tp_04_comment_tree::CommentTreeApi;
use tp_05_listing_index::{ListingApi, ListingKey, Trigger};
use tracing::{debug, info, warn};

const COMPONENT: &str = "vote_consumer";

/// Dependencies for [`VoteConsumer`].
pub struct ConsumerDependencies {
    pub ledger: Arc<dyn VoteLedgerApi>,
    pub directory: Arc<dyn ItemDirectory>,
    pub trees: Arc<dyn CommentTreeApi>,
    pub listings: Arc<dyn ListingApi>,
    pub cache: Arc<dyn CacheInvalidation>,
    pub publisher: Arc<dyn EventPublisher>,
}

/// What the fan-out after an applied vote did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReport {
    pub tree_notified: bool,
    pub listings_rebuilt: usize,
    pub listings_deferred: usize,
    pub fragments_marked: usize,
    pub failures: usize,
}

pub struct VoteConsumer {
    ledger: Arc<dyn VoteLedgerApi>,
    directory: Arc<dyn ItemDirectory>,
    trees: Arc<dyn CommentTreeApi>,
    listings: Arc<dyn ListingApi>,
    cache: Arc<dyn CacheInvalidation>,
    publisher: Arc<dyn EventPublisher>,
    config: ConsumerConfig,
    stats: ConsumerStats,
}

impl VoteConsumer {
    pub fn new(deps: ConsumerDependencies, config: ConsumerConfig) -> Self {
        Self {
            ledger: deps.ledger,
            directory: deps.directory,
            trees: deps.trees,
            listings: deps.listings,
            cache: deps.cache,
            publisher: deps.publisher,
            config,
            stats: ConsumerStats::default(),
        }
    }

    pub fn stats(&self) -> ConsumerStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    /// Dispatch a decoded message.
    pub async fn dispatch(&self, message: QueueMessage) -> Result<(), ConsumerError> {
        match message {
            QueueMessage::Vote { .. } => {
                let Some(vote) = message.as_vote() else {
                    return Err(ConsumerError::malformed("vote without fields"));
                };
                self.handle_vote(&vote).await.map(|_| ())
            }
            QueueMessage::TreeRebuild { root_id } => {
                ConsumerStats::incr(&self.stats.maintenance);
                self.trees.notify_structural(root_id).await?;
                Ok(())
            }
            QueueMessage::ListingRebuild {
                container_id,
                sort,
                window,
            } => {
                ConsumerStats::incr(&self.stats.maintenance);
                // A request naming one exact listing is an explicit rebuild.
                if let (Some(sort), Some(window)) = (sort, window) {
                    self.listings
                        .rebuild(ListingKey::new(container_id, sort, window))
                        .await?;
                    return Ok(());
                }
                let mut first_error = None;
                for key in ListingKey::expand(container_id, sort, window) {
                    if let Err(e) = self.listings.invalidate(key).await {
                        first_error.get_or_insert(e);
                    }
                }
                first_error.map_or(Ok(()), |e| Err(e.into()))
            }
            QueueMessage::ListingSweep => {
                ConsumerStats::incr(&self.stats.maintenance);
                let report = self.listings.sweep().await;
                debug!(rebuilt = report.rebuilt, failed = report.failed, "Sweep requested by queue");
                Ok(())
            }
        }
    }

    /// Apply a vote and, when it changed the aggregate, fan out.
    pub async fn handle_vote(&self, vote: &Vote) -> Result<Option<FanOutReport>, ConsumerError> {
        let outcome = match self.ledger.apply_vote(vote).await {
            Ok(outcome) => outcome,
            Err(e) => {
                match e.class() {
                    ErrorClass::Malformed => {
                        ConsumerStats::incr(&self.stats.votes_rejected);
                        metric_inc!(metrics::VOTES_REJECTED);
                        self.publisher
                            .publish(PipelineEvent::VoteRejected {
                                item_id: vote.item_id,
                                reason: e.to_string(),
                            })
                            .await;
                    }
                    ErrorClass::CorruptAggregate => {
                        ConsumerStats::incr(&self.stats.quarantined);
                        metric_inc!(metrics::CRITICAL_ERRORS, &[Component::VoteLedger.as_str()]);
                    }
                    _ => {}
                }
                return Err(e.into());
            }
        };

        match outcome {
            LedgerOutcome::NoOp => {
                ConsumerStats::incr(&self.stats.votes_noop);
                metric_inc!(metrics::VOTES_NOOP);
                log_vote_event!(debug, COMPONENT, "Vote was a no-op", vote.item_id, vote.voter_id);
                Ok(None)
            }
            LedgerOutcome::Applied { new, .. } => {
                ConsumerStats::incr(&self.stats.votes_applied);
                metric_inc!(metrics::VOTES_APPLIED);
                log_vote_event!(
                    debug,
                    COMPONENT,
                    "Vote applied",
                    vote.item_id,
                    vote.voter_id,
                    ups = new.ups,
                    downs = new.downs
                );
                Ok(Some(self.fan_out(vote.item_id).await))
            }
        }
    }

    /// Propagate an applied vote. Never fails; every failed step is logged
    /// and counted.
    pub async fn fan_out(&self, item_id: ItemId) -> FanOutReport {
        let mut report = FanOutReport::default();
        let info = match self.directory.item_info(item_id).await {
            Ok(Some(info)) => info,
            Ok(None) => {
                warn!(item_id = %item_id, "Voted item vanished before fan-out");
                self.fanout_failed(&mut report);
                return report;
            }
            Err(e) => {
                warn!(item_id = %item_id, error = %e, "Directory lookup failed during fan-out");
                self.fanout_failed(&mut report);
                return report;
            }
        };

        if let Some(root_id) = info.root_id.filter(|_| info.is_comment()) {
            match self.trees.notify_vote(root_id, item_id).await {
                Ok(()) => report.tree_notified = true,
                Err(e) => {
                    warn!(item_id = %item_id, root_id = %root_id, error = %e, "Tree notification failed");
                    self.fanout_failed(&mut report);
                }
            }
        }

        let listing_keys = ListingKey::vote_sensitive(info.container_id);
        for key in &listing_keys {
            match self.listings.invalidate(*key).await {
                Ok(Trigger::Now) => report.listings_rebuilt += 1,
                Ok(Trigger::Deferred) => report.listings_deferred += 1,
                Err(e) => {
                    warn!(listing = %key, error = %e, "Listing invalidation failed");
                    self.fanout_failed(&mut report);
                }
            }
        }

        let fragments = fragment_keys(&info, &listing_keys);
        for key in &fragments {
            self.cache.mark_stale(key).await;
        }
        report.fragments_marked = fragments.len();
        metrics::CACHE_INVALIDATIONS
            .with_label_values(&["stale"])
            .inc_by(fragments.len() as u64);
        self.publisher
            .publish(PipelineEvent::CacheInvalidated {
                key: keys::item_fragment_key(item_id),
                stale: true,
            })
            .await;

        debug!(item_id = %item_id, ?report, "Fan-out complete");
        report
    }

    fn fanout_failed(&self, report: &mut FanOutReport) {
        report.failures += 1;
        ConsumerStats::incr(&self.stats.fanout_failures);
    }

    /// Store trouble never dead-letters a delivery: it comes back after a
    /// backoff until the store recovers.
    fn disposition_for(&self, error: &ConsumerError, delivery: &Delivery) -> Disposition {
        match error.class() {
            ErrorClass::Malformed => Disposition::DeadLetter(error.to_string()),
            ErrorClass::CorruptAggregate | ErrorClass::DuplicateVote => Disposition::Ack,
            ErrorClass::TransientStoreError | ErrorClass::LockContention | ErrorClass::QueueUnavailable => {
                Disposition::Requeue(self.config.redelivery_delay(delivery.attempt))
            }
        }
    }
}

/// Fragment keys rendered from the item: its own fragment, its listings
/// and, for comments, its discussion tree.
fn fragment_keys(info: &ItemInfo, listings: &[ListingKey]) -> Vec<String> {
    let mut fragments = vec![keys::item_fragment_key(info.item_id)];
    fragments.extend(
        listings
            .iter()
            .map(|k| keys::listing_fragment_key(k.container_id, k.sort, k.window)),
    );
    if let Some(root_id) = info.root_id {
        fragments.push(keys::tree_fragment_key(root_id));
    }
    fragments
}

#[async_trait]
impl MessageHandler for VoteConsumer {
    async fn handle(&self, delivery: &Delivery) -> Disposition {
        if delivery.version > QueueEnvelope::<()>::CURRENT_VERSION {
            return Disposition::DeadLetter(format!("unsupported envelope version {}", delivery.version));
        }

        let message = match QueueMessage::decode(&delivery.payload) {
            Ok(message) => message,
            Err(e) => {
                if delivery.queue.starts_with("votes.") {
                    ConsumerStats::incr(&self.stats.votes_rejected);
                    metric_inc!(metrics::VOTES_REJECTED);
                }
                return Disposition::DeadLetter(e.to_string());
            }
        };

        match self.dispatch(message).await {
            Ok(()) => Disposition::Ack,
            Err(e) => {
                let disposition = self.disposition_for(&e, delivery);
                if let Disposition::Requeue(delay) = &disposition {
                    if self.config.overdue(delivery.attempt) {
                        warn!(
                            queue = %delivery.queue,
                            attempt = delivery.attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Delivery still failing, retrying"
                        );
                    } else {
                        debug!(queue = %delivery.queue, attempt = delivery.attempt, error = %e, "Retrying delivery");
                    }
                } else if e.class() == ErrorClass::CorruptAggregate {
                    info!(queue = %delivery.queue, error = %e, "Delivery acked over quarantined aggregate");
                }
                disposition
            }
        }
    }
}
