//! # Listing Flow
//!
//! Listings are rebuilt from directory candidates and ledger aggregates.
//! Every rebuild bumps the generation; cursors minted under an older
//! generation restart at the first page.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::Pipeline;
    use shared_bus::{EventFilter, EventTopic, PipelineEvent};
    use shared_types::{ContainerId, ItemId, SortOrder, TimeWindow, VoteDirection};
    use tp_05_listing_index::{ListingApi, ListingKey};

    const CONTAINER: u64 = 40;
    const MINUTE: u64 = 60_000;

    fn top() -> ListingKey {
        ListingKey::new(ContainerId(CONTAINER), SortOrder::Top, TimeWindow::All)
    }

    /// Six links scored 5, 3, 1, 0, -1, 2.
    async fn populated() -> Pipeline {
        let pipeline = Pipeline::new();
        for (item, age) in [(1, 50), (2, 40), (3, 30), (4, 20), (5, 10), (6, 5)] {
            pipeline.link(item, CONTAINER, age * MINUTE);
        }
        pipeline.upvotes(ItemId(1), 100, 5).await;
        pipeline.upvotes(ItemId(2), 200, 3).await;
        pipeline.upvotes(ItemId(3), 300, 1).await;
        pipeline
            .cast(400, ItemId(5), VoteDirection::Down)
            .await
            .unwrap();
        pipeline.upvotes(ItemId(6), 600, 2).await;
        pipeline
    }

    fn ids(raw: &[u64]) -> Vec<ItemId> {
        raw.iter().copied().map(ItemId).collect()
    }

    #[tokio::test]
    async fn test_pages_follow_rank_order() {
        let pipeline = populated().await;
        let listings = &pipeline.container.listings;
        listings.rebuild(top()).await.unwrap();

        let first = listings.get_listing_page(top(), None, 2).await.unwrap();
        assert_eq!(first.item_ids, ids(&[1, 2]));
        assert!(!first.restarted);

        let second = listings
            .get_listing_page(top(), first.next_cursor.as_deref(), 2)
            .await
            .unwrap();
        assert_eq!(second.item_ids, ids(&[6, 3]));

        let third = listings
            .get_listing_page(top(), second.next_cursor.as_deref(), 2)
            .await
            .unwrap();
        assert_eq!(third.item_ids, ids(&[4, 5]));
        assert!(third.next_cursor.is_none());
        assert_eq!(first.generation, third.generation);
    }

    #[tokio::test]
    async fn test_generation_strictly_increases() {
        let pipeline = populated().await;
        let listings = &pipeline.container.listings;
        let mut rebuilt = pipeline
            .container
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::Listings]));

        let mut last = listings.listing(top()).await.unwrap().map_or(0, |l| l.generation);
        for _ in 0..3 {
            let listing = listings.rebuild(top()).await.unwrap();
            assert!(listing.generation > last);
            last = listing.generation;
        }

        let generations: Vec<u64> = rebuilt
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                PipelineEvent::ListingRebuilt { generation, sort: SortOrder::Top, .. } => Some(generation),
                _ => None,
            })
            .collect();
        assert_eq!(generations.len(), 3);
        assert!(generations.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_old_cursor_restarts_at_first_page() {
        let pipeline = populated().await;
        let listings = &pipeline.container.listings;
        listings.rebuild(top()).await.unwrap();

        let first = listings.get_listing_page(top(), None, 2).await.unwrap();
        let stale_cursor = first.next_cursor.clone().unwrap();

        // Item 4 overtakes everything before the next rebuild.
        pipeline.upvotes(ItemId(4), 1_000, 9).await;
        let newer = listings.rebuild(top()).await.unwrap();
        assert!(newer.generation > first.generation);

        let page = listings
            .get_listing_page(top(), Some(&stale_cursor), 2)
            .await
            .unwrap();
        assert!(page.restarted);
        assert_eq!(page.generation, newer.generation);
        assert_eq!(page.item_ids, ids(&[4, 1]));

        let garbage = listings
            .get_listing_page(top(), Some("not-a-cursor"), 2)
            .await
            .unwrap();
        assert!(garbage.restarted);
        assert_eq!(garbage.item_ids, page.item_ids);
    }

    #[tokio::test]
    async fn test_deferred_rebuilds_flush_after_debounce() {
        let pipeline = populated().await;
        let listings = &pipeline.container.listings;
        assert!(listings.pending_count() > 0);
        let before = listings.listing(top()).await.unwrap().unwrap();

        let early = listings.flush_pending().await;
        assert_eq!(early.rebuilt, 0);

        pipeline
            .time
            .advance(pipeline.container.config.listing.debounce_ms);
        let report = listings.flush_pending().await;
        assert_eq!(report.rebuilt, ListingKey::vote_sensitive(ContainerId(CONTAINER)).len());
        assert_eq!(listings.pending_count(), 0);

        let after = listings.listing(top()).await.unwrap().unwrap();
        assert!(after.generation > before.generation);
        assert_eq!(after.item_ids, ids(&[1, 2, 6, 3, 4, 5]));
    }

    #[tokio::test]
    async fn test_time_window_limits_candidates() {
        let pipeline = Pipeline::new();
        let fresh = pipeline.link(1, CONTAINER, 10 * MINUTE);
        let old = pipeline.link(2, CONTAINER, 3 * 60 * MINUTE);
        let listings = &pipeline.container.listings;

        let hour = ListingKey::new(ContainerId(CONTAINER), SortOrder::New, TimeWindow::Hour);
        let day = ListingKey::new(ContainerId(CONTAINER), SortOrder::New, TimeWindow::Day);

        assert_eq!(listings.rebuild(hour).await.unwrap().item_ids, vec![fresh]);
        assert_eq!(listings.rebuild(day).await.unwrap().item_ids, vec![fresh, old]);
    }

    #[tokio::test]
    async fn test_missing_listing_is_built_on_read() {
        let pipeline = Pipeline::new();
        pipeline.link(1, CONTAINER, 0);
        let key = ListingKey::new(ContainerId(CONTAINER), SortOrder::Controversial, TimeWindow::Week);

        assert!(pipeline.container.listings.listing(key).await.unwrap().is_none());
        let page = pipeline
            .container
            .listings
            .get_listing_page(key, None, 0)
            .await
            .unwrap();
        assert_eq!(page.item_ids, ids(&[1]));
        assert_eq!(page.generation, 1);
    }
}
