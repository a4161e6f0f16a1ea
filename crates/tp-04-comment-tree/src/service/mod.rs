//! # Comment-Tree Maintainer Service
//!
//! Drives the per-root state machine. The task whose signal found a root
//! clean runs passes until no signal is pending; every other signal is
//! absorbed into that loop.

mod stats;
#[cfg(test)]
mod tests;

pub use stats::{TreeStats, TreeStatsSnapshot};

use crate::domain::{CommentTree, DirtyKind, NodeRank, RootTracker, Signal, TreeConfig, TreeError, TreeState};
use crate::ports::{CommentSource, CommentTreeApi, RankSource};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_bus::{EventPublisher, PipelineEvent, TreePass};
use shared_types::{keys, ItemAggregate, ItemId, ItemInfo, SortOrder, Timestamp};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tp_01_cache_tier::{call_to_completion, call_with_deadline, KeyValueStore, LockTier, RecomputeLock};
use tp_02_ranking::{QaPost, RankingApi};
use tracing::{debug, info, warn};

/// Dependencies for [`CommentTreeMaintainer`].
pub struct TreeDependencies {
    pub store: Arc<dyn KeyValueStore>,
    pub locks: Arc<dyn LockTier>,
    pub comments: Arc<dyn CommentSource>,
    pub ranks: Arc<dyn RankSource>,
    pub ranking: Arc<dyn RankingApi>,
    pub publisher: Arc<dyn EventPublisher>,
}

pub struct CommentTreeMaintainer {
    store: Arc<dyn KeyValueStore>,
    locks: Arc<dyn LockTier>,
    comments: Arc<dyn CommentSource>,
    ranks: Arc<dyn RankSource>,
    ranking: Arc<dyn RankingApi>,
    publisher: Arc<dyn EventPublisher>,
    config: TreeConfig,
    roots: Mutex<HashMap<ItemId, RootTracker>>,
    stats: TreeStats,
}

impl CommentTreeMaintainer {
    pub fn new(deps: TreeDependencies, config: TreeConfig) -> Self {
        Self {
            store: deps.store,
            locks: deps.locks,
            comments: deps.comments,
            ranks: deps.ranks,
            ranking: deps.ranking,
            publisher: deps.publisher,
            config,
            roots: Mutex::new(HashMap::new()),
            stats: TreeStats::default(),
        }
    }

    pub fn stats(&self) -> TreeStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Roots with a pass pending or in flight.
    pub fn busy_roots(&self) -> usize {
        self.roots.lock().len()
    }

    /// Roots parked after repeated failed passes.
    pub fn parked_roots(&self) -> Vec<ItemId> {
        let mut parked: Vec<ItemId> = self
            .roots
            .lock()
            .iter()
            .filter(|(_, root)| root.is_parked())
            .map(|(id, _)| *id)
            .collect();
        parked.sort();
        parked
    }

    async fn drive(&self, root_id: ItemId, kind: DirtyKind) -> Result<(), TreeError> {
        let signal = self.roots.lock().entry(root_id).or_default().signal(kind);
        if signal != Signal::Start {
            TreeStats::incr(&self.stats.coalesced);
            debug!(root_id = %root_id, ?signal, "Tree signal coalesced");
            return Ok(());
        }
        self.run_passes(root_id).await
    }

    /// Run passes until the root is clean. A failed pass is retried with its
    /// work merged into whatever was queued meanwhile; after
    /// `pass_attempts` consecutive failures the root is parked.
    async fn run_passes(&self, root_id: ItemId) -> Result<(), TreeError> {
        loop {
            let Some(kind) = self.roots.lock().get_mut(&root_id).and_then(RootTracker::begin) else {
                return Ok(());
            };

            if let Err(e) = self.run_pass(root_id, kind.clone()).await {
                TreeStats::incr(&self.stats.failures);
                let failures = {
                    let mut roots = self.roots.lock();
                    let root = roots.entry(root_id).or_default();
                    let failures = root.fail(kind);
                    if failures >= self.config.pass_attempts.max(1) {
                        root.park();
                    }
                    failures
                };
                if failures >= self.config.pass_attempts.max(1) {
                    warn!(root_id = %root_id, error = %e, failures, "Tree pass failed; root parked");
                    return Err(e);
                }
                warn!(root_id = %root_id, error = %e, failures, "Tree pass failed; retrying");
                tokio::time::sleep(self.config.retry.next_delay(failures)).await;
                continue;
            }

            let mut roots = self.roots.lock();
            let again = roots.get_mut(&root_id).map_or(false, RootTracker::finish);
            if !again {
                roots.remove(&root_id);
                return Ok(());
            }
        }
    }

    async fn run_pass(&self, root_id: ItemId, kind: DirtyKind) -> Result<(), TreeError> {
        let lock = self.acquire(&keys::lock_key(&keys::tree_key(root_id))).await?;
        let result = match kind {
            DirtyKind::Structural => self.rebuild(root_id).await,
            // A vote on an answer moves its question, so qa trees relink.
            DirtyKind::RankOnly(_) if self.config.sort == SortOrder::Qa => self.rebuild(root_id).await,
            DirtyKind::RankOnly(affected) => self.resort(root_id, &affected).await,
        };
        self.locks.release(&lock);
        result
    }

    async fn acquire(&self, key: &str) -> Result<RecomputeLock, TreeError> {
        let attempts = self.config.lock_attempts.max(1);
        for attempt in 1..=attempts {
            if let Some(lock) = self.locks.try_acquire(key, self.config.lock_ttl_ms) {
                return Ok(lock);
            }
            if attempt < attempts {
                tokio::time::sleep(Duration::from_millis(self.config.lock_retry_ms)).await;
            }
        }
        Err(TreeError::LockContention {
            key: key.to_string(),
            attempts,
        })
    }

    async fn rebuild(&self, root_id: ItemId) -> Result<(), TreeError> {
        let comments = self.comments.comments_for_root(root_id).await?;
        let ranks = if self.config.sort == SortOrder::Qa {
            self.qa_ranks(root_id, &comments).await?
        } else {
            let created: Vec<(ItemId, Timestamp)> = comments.iter().map(|c| (c.item_id, c.created_at)).collect();
            self.node_ranks(&created).await?
        };

        let (tree, dropped) = CommentTree::build(root_id, self.config.sort, &comments, &ranks);
        if dropped > 0 {
            warn!(root_id = %root_id, dropped, "Comments in a parent cycle left out of the tree");
        }
        self.save(&tree).await?;

        TreeStats::incr(&self.stats.rebuilds);
        info!(root_id = %root_id, nodes = tree.len(), "Comment tree rebuilt");
        self.publisher
            .publish(PipelineEvent::TreeUpdated {
                root_id,
                pass: TreePass::Rebuild,
                nodes: tree.len(),
            })
            .await;
        Ok(())
    }

    async fn resort(&self, root_id: ItemId, affected: &BTreeSet<ItemId>) -> Result<(), TreeError> {
        let Some(mut tree) = self.load(root_id).await?.filter(|t| t.sort == self.config.sort) else {
            TreeStats::incr(&self.stats.escalations);
            return self.rebuild(root_id).await;
        };

        let mut touched: BTreeSet<ItemId> = affected.clone();
        for id in affected {
            if let Some(node) = tree.get(*id) {
                touched.extend(tree.children_of(node.parent_id).iter().copied());
            }
        }
        let created: Vec<(ItemId, Timestamp)> = touched
            .iter()
            .filter_map(|id| tree.get(*id).map(|n| (*id, n.created_at)))
            .collect();
        let ranks = self.node_ranks(&created).await?;

        match tree.resort(affected, &ranks) {
            Ok(lists) => debug!(root_id = %root_id, lists, "Siblings re-sorted"),
            Err(TreeError::UnknownComment { comment_id, .. }) => {
                debug!(root_id = %root_id, comment_id = %comment_id, "Unlinked comment, rebuilding");
                TreeStats::incr(&self.stats.escalations);
                return self.rebuild(root_id).await;
            }
            Err(e) => return Err(e),
        }
        self.save(&tree).await?;

        TreeStats::incr(&self.stats.resorts);
        self.publisher
            .publish(PipelineEvent::TreeUpdated {
                root_id,
                pass: TreePass::Resort,
                nodes: tree.len(),
            })
            .await;
        Ok(())
    }

    /// Current score and sort key of each comment.
    async fn node_ranks(&self, items: &[(ItemId, Timestamp)]) -> Result<HashMap<ItemId, NodeRank>, TreeError> {
        let aggregates = self.current_aggregates(items).await?;
        Ok(aggregates
            .into_iter()
            .map(|(id, agg)| {
                let rank = NodeRank {
                    score: agg.score,
                    rank: self.ranking.rank_value(self.config.sort, &agg),
                };
                (id, rank)
            })
            .collect())
    }

    /// Ranks under the qa sort. A reply written by the root's author is an
    /// answer to its parent.
    async fn qa_ranks(&self, root_id: ItemId, comments: &[ItemInfo]) -> Result<HashMap<ItemId, NodeRank>, TreeError> {
        let created: Vec<(ItemId, Timestamp)> = comments.iter().map(|c| (c.item_id, c.created_at)).collect();
        let aggregates = self.current_aggregates(&created).await?;
        let post = |info: &ItemInfo| {
            let agg = aggregates.get(&info.item_id);
            QaPost {
                ups: agg.map_or(0, |a| a.ups),
                downs: agg.map_or(0, |a| a.downs),
                body_len: info.body_len,
            }
        };

        let mut answers: HashMap<ItemId, Vec<QaPost>> = HashMap::new();
        if let Some(op) = self.comments.root_author(root_id).await? {
            for info in comments.iter().filter(|c| c.author_id == op) {
                if let Some(parent) = info.parent_id {
                    answers.entry(parent).or_default().push(post(info));
                }
            }
        }

        Ok(comments
            .iter()
            .map(|info| {
                let replies = answers.get(&info.item_id).map(Vec::as_slice).unwrap_or_default();
                let rank = NodeRank {
                    score: aggregates.get(&info.item_id).map_or(0, |a| a.score),
                    rank: self.ranking.qa_rank(post(info), replies),
                };
                (info.item_id, rank)
            })
            .collect())
    }

    /// Aggregates of `items`. Comments never voted on count as an empty
    /// aggregate created at `created_at`.
    async fn current_aggregates(
        &self,
        items: &[(ItemId, Timestamp)],
    ) -> Result<HashMap<ItemId, ItemAggregate>, TreeError> {
        let ids: Vec<ItemId> = items.iter().map(|(id, _)| *id).collect();
        let mut found: HashMap<ItemId, ItemAggregate> = self
            .ranks
            .aggregates(&ids)
            .await?
            .into_iter()
            .map(|agg| (agg.item_id, agg))
            .collect();

        Ok(items
            .iter()
            .map(|(id, created_at)| {
                let agg = found.remove(id).unwrap_or_else(|| {
                    self.ranking
                        .recompute(&ItemAggregate::empty(*id, *created_at), 0, 0, *created_at)
                });
                (*id, agg)
            })
            .collect())
    }

    async fn load(&self, root_id: ItemId) -> Result<Option<CommentTree>, TreeError> {
        let key = keys::tree_key(root_id);
        let timeout = Duration::from_millis(self.config.store_timeout_ms);
        call_with_deadline(&self.store, timeout, "load_tree", move |store| {
            store
                .get(key.as_bytes())?
                .map(|bytes| CommentTree::decode(&key, &bytes))
                .transpose()
                .map_err(TreeError::from)
        })
        .await
    }

    async fn save(&self, tree: &CommentTree) -> Result<(), TreeError> {
        let key = keys::tree_key(tree.root_id);
        let bytes = tree.encode(&key)?;
        let timeout = Duration::from_millis(self.config.store_timeout_ms);
        call_to_completion(&self.store, timeout, "save_tree", move |store| {
            Ok(store.put(key.as_bytes(), &bytes)?)
        })
        .await
    }
}

#[async_trait]
impl CommentTreeApi for CommentTreeMaintainer {
    async fn notify_structural(&self, root_id: ItemId) -> Result<(), TreeError> {
        self.drive(root_id, DirtyKind::Structural).await
    }

    async fn notify_vote(&self, root_id: ItemId, comment_id: ItemId) -> Result<(), TreeError> {
        self.drive(root_id, DirtyKind::rank_only(comment_id)).await
    }

    async fn tree(&self, root_id: ItemId) -> Result<Option<CommentTree>, TreeError> {
        self.load(root_id).await
    }

    async fn retry_parked(&self) -> usize {
        let mut recovered = 0;
        for root_id in self.parked_roots() {
            let resumed = self.roots.lock().get_mut(&root_id).map_or(false, RootTracker::unpark);
            if resumed && self.run_passes(root_id).await.is_ok() {
                recovered += 1;
            }
        }
        if recovered > 0 {
            info!(recovered, "Parked comment trees recovered");
        }
        recovered
    }

    fn state(&self, root_id: ItemId) -> TreeState {
        self.roots
            .lock()
            .get(&root_id)
            .map(|root| root.state().clone())
            .unwrap_or_default()
    }
}
