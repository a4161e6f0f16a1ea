//! # Cache Flow
//!
//! A vote demotes the fragments that show the item to the stale tier. While
//! another worker holds the recompute lock, readers get the stale copy; once
//! the lock is released the next reader renders the new value.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::Pipeline;
    use async_trait::async_trait;
    use shared_types::{keys, ContainerId, ItemId, SortOrder, TimeWindow, VoteDirection};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tp_01_cache_tier::{
        CacheError, CachePolicy, CacheValue, FragmentRenderer, Freshness, LockTier, PageAssembler, Slot,
    };
    use tp_03_vote_ledger::{VoteLedger, VoteLedgerApi};

    /// Renders `score=N` for the item named by the fragment key.
    struct ScoreRenderer {
        ledger: Arc<VoteLedger>,
        item: ItemId,
        renders: AtomicUsize,
    }

    #[async_trait]
    impl FragmentRenderer for ScoreRenderer {
        async fn render(&self, key: &str) -> Result<Vec<u8>, CacheError> {
            self.renders.fetch_add(1, Ordering::SeqCst);
            let score = self
                .ledger
                .aggregate(self.item)
                .await
                .map_err(|e| CacheError::compute(key, e.to_string()))?
                .map_or(0, |agg| agg.score);
            Ok(format!("score={score}").into_bytes())
        }
    }

    fn text(value: &CacheValue) -> String {
        String::from_utf8(value.as_bytes().unwrap_or_default().to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_vote_serves_stale_under_contention() {
        let pipeline = Pipeline::new();
        let link = pipeline.link(1, 50, 0);
        let key = keys::item_fragment_key(link);
        let renderer = Arc::new(ScoreRenderer {
            ledger: Arc::clone(&pipeline.container.ledger),
            item: link,
            renders: AtomicUsize::new(0),
        });
        let pages = PageAssembler::new(Arc::clone(&pipeline.container.cache), renderer.clone());
        let slots = [Slot::new(key.clone())];

        let first = pages.assemble(&slots).await;
        assert!(first.is_complete());
        assert_eq!(first.render(b"?"), b"score=0");

        pipeline.cast(1, link, VoteDirection::Up).await.unwrap();
        assert!(pipeline.container.cache.peek(&key).is_none());

        // Another worker is re-rendering the fragment.
        let held = pipeline
            .container
            .locks
            .try_acquire(&keys::lock_key(&key), 10_000)
            .unwrap();
        let during = pages.assemble(&slots).await;
        assert!(during.has_stale());
        assert_eq!(during.render(b"?"), b"score=0");
        assert_eq!(renderer.renders.load(Ordering::SeqCst), 1);

        assert!(pipeline.container.locks.release(&held));
        let after = pages.assemble(&slots).await;
        assert_eq!(after.fragments[0].1.freshness, Freshness::Fresh);
        assert_eq!(after.render(b"?"), b"score=1");
        assert_eq!(renderer.renders.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_link_vote_demotes_listing_fragments() {
        let pipeline = Pipeline::new();
        let link = pipeline.link(2, 51, 0);
        let cache = &pipeline.container.cache;
        let hot = keys::listing_fragment_key(ContainerId(51), SortOrder::Hot, TimeWindow::All);
        let new = keys::listing_fragment_key(ContainerId(51), SortOrder::New, TimeWindow::All);

        for key in [&hot, &new] {
            cache
                .get_or_compute(key, CachePolicy::volatile(), || async {
                    Ok::<_, String>(b"page".to_vec())
                })
                .await;
        }

        pipeline.cast(1, link, VoteDirection::Up).await.unwrap();

        assert!(cache.peek(&hot).is_none());
        // New is ordered by time alone; a vote leaves it alone.
        assert!(cache.peek(&new).is_some());

        let reread = cache
            .get_or_compute(&hot, CachePolicy::volatile(), || async {
                Ok::<_, String>(b"page v2".to_vec())
            })
            .await;
        assert_eq!(text(&reread.value), "page v2");
    }

    #[tokio::test]
    async fn test_comment_vote_demotes_discussion_fragment() {
        let pipeline = Pipeline::new();
        let root = pipeline.link(10, 52, 0);
        let comment = pipeline.comment(11, 52, root, None);
        let cache = &pipeline.container.cache;
        let discussion = keys::tree_fragment_key(root);

        cache
            .put(&discussion, CachePolicy::volatile(), b"thread".to_vec())
            .await;
        pipeline.cast(3, comment, VoteDirection::Down).await.unwrap();
        assert!(cache.peek(&discussion).is_none());

        let _held = pipeline
            .container
            .locks
            .try_acquire(&keys::lock_key(&discussion), 10_000)
            .unwrap();
        let served = cache
            .get_or_compute(&discussion, CachePolicy::volatile(), || async {
                Ok::<_, String>(b"unreachable".to_vec())
            })
            .await;
        assert_eq!(served.freshness, Freshness::Stale);
        assert_eq!(text(&served.value), "thread");
    }

    #[tokio::test]
    async fn test_noop_vote_leaves_fragments_cached() {
        let pipeline = Pipeline::new();
        let link = pipeline.link(20, 53, 0);
        let key = keys::item_fragment_key(link);
        pipeline.cast(1, link, VoteDirection::Up).await.unwrap();

        pipeline
            .container
            .cache
            .put(&key, CachePolicy::volatile(), b"score=1".to_vec())
            .await;
        let replay = pipeline.cast(1, link, VoteDirection::Up).await.unwrap();

        assert!(replay.is_none());
        assert!(pipeline.container.cache.peek(&key).is_some());
    }
}
