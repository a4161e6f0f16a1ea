//! Pipeline harness shared by the integration flows.

use shared_types::{
    ContainerId, ItemAggregate, ItemId, ItemInfo, ManualTimeSource, TimeSource, Timestamp, UserId,
    Vote, VoteDirection,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tp_03_vote_ledger::VoteLedgerApi;
use tp_06_vote_consumer::{ConsumerError, FanOutReport, InMemoryQueue};
use worker_runtime::{Backends, PipelineContainer, RuntimeConfig};

/// 2023-11-14T22:13:20Z, in milliseconds.
pub const EPOCH_MS: Timestamp = 1_700_000_000_000;

pub const AUTHOR: UserId = UserId(9_999);

/// A wired pipeline over in-memory backends.
pub struct Pipeline {
    pub time: Arc<ManualTimeSource>,
    pub queue: Arc<InMemoryQueue>,
    pub container: PipelineContainer,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::for_testing())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let (time, queue, backends) = Self::backends();
        let container = PipelineContainer::with_backends(config, backends)
            .expect("test configuration is valid");
        Self {
            time,
            queue,
            container,
        }
    }

    /// Clock, queue handle and backends, for tests that assemble the
    /// runtime themselves.
    pub fn backends() -> (Arc<ManualTimeSource>, Arc<InMemoryQueue>, Backends) {
        let time = Arc::new(ManualTimeSource::new(EPOCH_MS));
        let clock: Arc<dyn TimeSource> = time.clone();
        let queue = Arc::new(InMemoryQueue::new(Arc::clone(&clock)));
        let mut backends = Backends::in_memory(clock);
        backends.queue = queue.clone();
        (time, queue, backends)
    }

    pub fn now(&self) -> Timestamp {
        self.time.now()
    }

    /// Register a link posted `age_ms` before now.
    pub fn link(&self, item: u64, container: u64, age_ms: u64) -> ItemId {
        let item_id = ItemId(item);
        self.container.directory.insert(ItemInfo::link(
            item_id,
            ContainerId(container),
            AUTHOR,
            self.now().saturating_sub(age_ms),
        ));
        item_id
    }

    /// Register a comment under `root` in `container`, created now.
    pub fn comment(&self, item: u64, container: u64, root: ItemId, parent: Option<u64>) -> ItemId {
        let item_id = ItemId(item);
        self.container.directory.insert(ItemInfo::comment(
            item_id,
            ContainerId(container),
            root,
            parent.map(ItemId),
            AUTHOR,
            self.now(),
        ));
        item_id
    }

    pub fn vote(&self, voter: u64, item: ItemId, direction: VoteDirection) -> Vote {
        Vote::new(UserId(voter), item, direction, self.now())
    }

    /// Apply a vote the way a consumer would after dequeuing it.
    pub async fn cast(
        &self,
        voter: u64,
        item: ItemId,
        direction: VoteDirection,
    ) -> Result<Option<FanOutReport>, ConsumerError> {
        let vote = self.vote(voter, item, direction);
        self.container.consumer.handle_vote(&vote).await
    }

    /// `count` distinct voters up-voting `item`, starting at voter `first`.
    pub async fn upvotes(&self, item: ItemId, first: u64, count: u64) {
        for voter in first..first + count {
            self.cast(voter, item, VoteDirection::Up)
                .await
                .expect("upvote applies");
        }
    }

    pub async fn aggregate(&self, item: ItemId) -> Option<ItemAggregate> {
        self.container
            .ledger
            .aggregate(item)
            .await
            .expect("ledger readable")
    }

    /// (ups, downs, score) of `item`, zero when never voted on.
    pub async fn counts(&self, item: ItemId) -> (u64, u64, i64) {
        self.aggregate(item)
            .await
            .map_or((0, 0, 0), |agg| (agg.ups, agg.downs, agg.score))
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Poll `check` every 10ms for up to 3s.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..300 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
