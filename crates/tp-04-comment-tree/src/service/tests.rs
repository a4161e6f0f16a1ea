use super::*;
use crate::adapters::{InMemoryCommentSource, InMemoryRankSource};
use shared_bus::{EventFilter, EventTopic, InMemoryEventBus};
use shared_types::{Classify, ContainerId, ErrorClass, ItemInfo, ManualTimeSource, SortOrder, StoreError, UserId};
use tokio::sync::watch;
use tp_01_cache_tier::{InMemoryKVStore, InMemoryLockTier};
use tp_02_ranking::RankingEngine;

const ROOT: ItemId = ItemId(1);
const CREATED: Timestamp = 1_700_000_000_000;

/// Rank source that blocks while its gate is closed.
struct GatedRankSource {
    inner: InMemoryRankSource,
    gate: watch::Sender<bool>,
}

impl GatedRankSource {
    fn new() -> Self {
        Self {
            inner: InMemoryRankSource::new(),
            gate: watch::channel(true).0,
        }
    }

    fn set_open(&self, open: bool) {
        self.gate.send_replace(open);
    }
}

#[async_trait]
impl RankSource for GatedRankSource {
    async fn aggregates(&self, item_ids: &[ItemId]) -> Result<Vec<ItemAggregate>, StoreError> {
        let mut rx = self.gate.subscribe();
        rx.wait_for(|open| *open)
            .await
            .map_err(|_| StoreError::Unavailable("gate dropped".into()))?;
        self.inner.aggregates(item_ids).await
    }
}

struct Harness {
    maintainer: Arc<CommentTreeMaintainer>,
    comments: Arc<InMemoryCommentSource>,
    ranks: Arc<GatedRankSource>,
    locks: Arc<InMemoryLockTier>,
    store: Arc<InMemoryKVStore>,
    bus: Arc<InMemoryEventBus>,
}

fn harness_with(config: TreeConfig) -> Harness {
    let time = Arc::new(ManualTimeSource::new(CREATED + 60_000));
    let store = Arc::new(InMemoryKVStore::new());
    let locks = Arc::new(InMemoryLockTier::new(time));
    let comments = Arc::new(InMemoryCommentSource::new());
    let ranks = Arc::new(GatedRankSource::new());
    let bus = Arc::new(InMemoryEventBus::new());
    let maintainer = CommentTreeMaintainer::new(
        TreeDependencies {
            store: store.clone(),
            locks: locks.clone(),
            comments: comments.clone(),
            ranks: ranks.clone(),
            ranking: Arc::new(RankingEngine::new()),
            publisher: bus.clone(),
        },
        config,
    );
    Harness {
        maintainer: Arc::new(maintainer),
        comments,
        ranks,
        locks,
        store,
        bus,
    }
}

fn harness() -> Harness {
    harness_with(TreeConfig::for_testing())
}

impl Harness {
    fn add_comment(&self, id: u64, parent: Option<u64>, ups: u64) {
        let id = ItemId(id);
        self.comments.add(ItemInfo::comment(
            id,
            ContainerId(3),
            ROOT,
            parent.map(ItemId),
            UserId(9),
            CREATED,
        ));
        self.set_ups(id, ups);
    }

    fn set_ups(&self, id: ItemId, ups: u64) {
        let engine = RankingEngine::new();
        let agg = engine.recompute(&ItemAggregate::empty(id, CREATED), ups, 0, CREATED);
        self.ranks.inner.set(agg);
    }

    async fn tree(&self) -> CommentTree {
        self.maintainer.tree(ROOT).await.unwrap().unwrap()
    }
}

fn ids(raw: &[u64]) -> Vec<ItemId> {
    raw.iter().copied().map(ItemId).collect()
}

async fn wait_for_state(maintainer: &CommentTreeMaintainer, want: TreeState) {
    for _ in 0..500 {
        if maintainer.state(ROOT) == want {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("root never reached {want:?}");
}

#[tokio::test]
async fn test_vote_reorders_siblings_and_keeps_other_sums() {
    let h = harness();
    h.add_comment(11, None, 3);
    h.add_comment(12, None, 1);
    h.add_comment(13, None, 2);
    h.add_comment(111, Some(11), 4);
    h.maintainer.notify_structural(ROOT).await.unwrap();

    let before = h.tree().await;
    assert_eq!(before.top_level, ids(&[11, 13, 12]));

    h.set_ups(ItemId(12), 5);
    h.maintainer.notify_vote(ROOT, ItemId(12)).await.unwrap();

    let after = h.tree().await;
    assert_eq!(after.top_level, ids(&[12, 11, 13]));
    assert_eq!(after.get(ItemId(12)).unwrap().subtree_vote_sum, 5);
    for unrelated in [11, 13, 111] {
        assert_eq!(
            after.get(ItemId(unrelated)).unwrap().subtree_vote_sum,
            before.get(ItemId(unrelated)).unwrap().subtree_vote_sum
        );
    }
    assert_eq!(h.maintainer.state(ROOT), TreeState::Clean);

    let stats = h.maintainer.stats();
    assert_eq!((stats.rebuilds, stats.resorts), (1, 1));
}

#[tokio::test]
async fn test_signals_during_resort_coalesce_into_one_pass() {
    let h = harness();
    h.add_comment(11, None, 3);
    h.add_comment(12, None, 1);
    h.add_comment(13, None, 2);
    h.maintainer.notify_structural(ROOT).await.unwrap();

    h.ranks.set_open(false);
    h.set_ups(ItemId(12), 5);
    let driver = {
        let maintainer = Arc::clone(&h.maintainer);
        tokio::spawn(async move { maintainer.notify_vote(ROOT, ItemId(12)).await })
    };
    wait_for_state(&h.maintainer, TreeState::Resorting).await;

    // Both ride on a single follow-up pass.
    h.set_ups(ItemId(13), 7);
    h.maintainer.notify_vote(ROOT, ItemId(13)).await.unwrap();
    h.maintainer.notify_vote(ROOT, ItemId(11)).await.unwrap();
    assert_eq!(h.maintainer.state(ROOT), TreeState::Resorting);

    h.ranks.set_open(true);
    driver.await.unwrap().unwrap();

    assert_eq!(h.maintainer.state(ROOT), TreeState::Clean);
    assert_eq!(h.maintainer.busy_roots(), 0);
    let stats = h.maintainer.stats();
    assert_eq!(stats.resorts, 2);
    assert_eq!(stats.coalesced, 2);
    assert_eq!(h.tree().await.top_level, ids(&[13, 12, 11]));
}

#[tokio::test]
async fn test_structural_signal_during_resort_wins() {
    let h = harness();
    h.add_comment(11, None, 1);
    h.maintainer.notify_structural(ROOT).await.unwrap();

    h.ranks.set_open(false);
    let driver = {
        let maintainer = Arc::clone(&h.maintainer);
        tokio::spawn(async move { maintainer.notify_vote(ROOT, ItemId(11)).await })
    };
    wait_for_state(&h.maintainer, TreeState::Resorting).await;

    h.add_comment(14, Some(11), 2);
    h.maintainer.notify_structural(ROOT).await.unwrap();
    h.ranks.set_open(true);
    driver.await.unwrap().unwrap();

    let tree = h.tree().await;
    assert_eq!(tree.children_of(Some(ItemId(11))), ids(&[14]).as_slice());
    assert_eq!(h.maintainer.stats().rebuilds, 2);
}

#[tokio::test]
async fn test_vote_on_unlinked_comment_escalates() {
    let h = harness();
    h.add_comment(11, None, 1);
    h.maintainer.notify_structural(ROOT).await.unwrap();

    h.add_comment(15, None, 9);
    h.maintainer.notify_vote(ROOT, ItemId(15)).await.unwrap();

    assert_eq!(h.tree().await.top_level, ids(&[15, 11]));
    let stats = h.maintainer.stats();
    assert_eq!(stats.escalations, 1);
    assert_eq!(stats.rebuilds, 2);
}

#[tokio::test]
async fn test_vote_without_stored_tree_builds_it() {
    let h = harness();
    h.add_comment(11, None, 1);
    h.maintainer.notify_vote(ROOT, ItemId(11)).await.unwrap();
    assert_eq!(h.tree().await.len(), 1);
    assert!(h.store.exists(b"tree:1").unwrap());
}

#[tokio::test]
async fn test_removed_comment_disappears_on_rebuild() {
    let h = harness();
    h.add_comment(11, None, 1);
    h.add_comment(12, Some(11), 1);
    h.maintainer.notify_structural(ROOT).await.unwrap();

    h.comments.remove(ItemId(12));
    h.maintainer.notify_structural(ROOT).await.unwrap();

    let tree = h.tree().await;
    assert!(!tree.contains(ItemId(12)));
    assert_eq!(tree.get(ItemId(11)).unwrap().subtree_vote_sum, 1);
}

#[tokio::test]
async fn test_held_lock_parks_root_until_retry() {
    let h = harness_with(TreeConfig {
        lock_attempts: 2,
        pass_attempts: 2,
        ..TreeConfig::for_testing()
    });
    h.add_comment(11, None, 1);
    let held = h.locks.try_acquire("lock:tree:1", 60_000).unwrap();

    let err = h.maintainer.notify_structural(ROOT).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::LockContention);
    assert_eq!(h.maintainer.state(ROOT), TreeState::Dirty(DirtyKind::Structural));
    assert_eq!(h.maintainer.parked_roots(), vec![ROOT]);
    assert_eq!(h.maintainer.stats().failures, 2);

    h.locks.release(&held);
    assert_eq!(h.maintainer.retry_parked().await, 1);
    assert_eq!(h.maintainer.state(ROOT), TreeState::Clean);
    assert!(h.maintainer.parked_roots().is_empty());
    assert_eq!(h.tree().await.len(), 1);
}

#[tokio::test]
async fn test_store_blip_is_retried() {
    let h = harness();
    h.add_comment(11, None, 1);
    h.store.fail_next(1);
    h.maintainer.notify_structural(ROOT).await.unwrap();

    assert_eq!(h.tree().await.len(), 1);
    assert_eq!(h.maintainer.stats().failures, 1);
    assert_eq!(h.maintainer.state(ROOT), TreeState::Clean);
}

#[tokio::test]
async fn test_store_outage_surfaces_as_transient() {
    let h = harness_with(TreeConfig {
        pass_attempts: 1,
        ..TreeConfig::for_testing()
    });
    h.add_comment(11, None, 1);
    h.store.fail_next(1);
    let err = h.maintainer.notify_structural(ROOT).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::TransientStoreError);

    // The next signal picks the parked root back up.
    h.maintainer.notify_vote(ROOT, ItemId(11)).await.unwrap();
    assert_eq!(h.tree().await.len(), 1);
    assert!(h.maintainer.parked_roots().is_empty());
}

#[tokio::test]
async fn test_signal_queued_behind_failed_pass_is_applied() {
    let h = harness();
    h.add_comment(11, None, 3);
    h.add_comment(12, None, 1);
    h.add_comment(13, None, 2);
    h.maintainer.notify_structural(ROOT).await.unwrap();
    assert_eq!(h.tree().await.top_level, ids(&[11, 13, 12]));

    h.ranks.set_open(false);
    let driver = {
        let maintainer = Arc::clone(&h.maintainer);
        tokio::spawn(async move { maintainer.notify_vote(ROOT, ItemId(11)).await })
    };
    wait_for_state(&h.maintainer, TreeState::Resorting).await;

    // The in-flight pass will fail to save; the vote queued behind it must
    // still reach the tree.
    h.store.fail_next(1);
    h.set_ups(ItemId(13), 7);
    h.maintainer.notify_vote(ROOT, ItemId(13)).await.unwrap();
    h.ranks.set_open(true);
    driver.await.unwrap().unwrap();

    assert_eq!(h.maintainer.state(ROOT), TreeState::Clean);
    assert_eq!(h.maintainer.stats().failures, 1);
    assert_eq!(h.tree().await.top_level, ids(&[13, 11, 12]));
}

#[tokio::test]
async fn test_passes_publish_tree_events() {
    let h = harness();
    let mut sub = h.bus.subscribe(EventFilter::topics(vec![EventTopic::Trees]));
    h.add_comment(11, None, 1);
    h.maintainer.notify_structural(ROOT).await.unwrap();
    h.maintainer.notify_vote(ROOT, ItemId(11)).await.unwrap();

    let passes: Vec<TreePass> = sub
        .drain()
        .into_iter()
        .filter_map(|event| match event {
            PipelineEvent::TreeUpdated { pass, .. } => Some(pass),
            _ => None,
        })
        .collect();
    assert_eq!(passes, vec![TreePass::Rebuild, TreePass::Resort]);
}

#[tokio::test]
async fn test_top_sort_orders_by_score() {
    let h = harness_with(TreeConfig {
        sort: SortOrder::Top,
        ..TreeConfig::for_testing()
    });
    h.add_comment(11, None, 2);
    h.add_comment(12, None, 40);
    h.maintainer.notify_structural(ROOT).await.unwrap();

    let tree = h.tree().await;
    assert_eq!(tree.sort, SortOrder::Top);
    assert_eq!(tree.top_level, ids(&[12, 11]));
    assert_eq!(tree.get(ItemId(12)).unwrap().rank, 40.0);
}

#[tokio::test]
async fn test_qa_sort_follows_answers_from_root_author() {
    let h = harness_with(TreeConfig {
        sort: SortOrder::Qa,
        ..TreeConfig::for_testing()
    });
    let op = UserId(50);
    h.comments.set_root_author(ROOT, op);
    let post = |id: u64, parent: Option<u64>, author: UserId, ups: u64| {
        h.comments.add(
            ItemInfo::comment(ItemId(id), ContainerId(3), ROOT, parent.map(ItemId), author, CREATED)
                .with_body_len(10),
        );
        h.set_ups(ItemId(id), ups);
    };
    post(11, None, UserId(9), 3);
    post(12, None, UserId(9), 5);
    post(111, Some(11), op, 20);
    post(121, Some(12), UserId(8), 20);
    h.maintainer.notify_structural(ROOT).await.unwrap();

    // 11 trails on its own votes but carries the author's answer.
    let tree = h.tree().await;
    assert_eq!(tree.sort, SortOrder::Qa);
    assert_eq!(tree.top_level, ids(&[11, 12]));

    // Votes on the answer move the question.
    h.set_ups(ItemId(111), 0);
    h.maintainer.notify_vote(ROOT, ItemId(111)).await.unwrap();
    assert_eq!(h.tree().await.top_level, ids(&[12, 11]));
    assert_eq!(h.maintainer.stats().resorts, 0);
}
