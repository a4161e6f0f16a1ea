//! # Vote Flow
//!
//! Ledger application and consumer fan-out for a single vote:
//!
//! 1. **Ledger**: the stored direction decides the delta; a matching
//!    direction is a no-op
//! 2. **Fan-out**: vote-sensitive listings are invalidated through the
//!    debounce, item fragments are demoted to stale, comment votes notify
//!    the tree maintainer

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::Pipeline;
    use shared_bus::{EventFilter, EventTopic, PipelineEvent};
    use shared_types::{Classify, ContainerId, ErrorClass, ItemId, UserId, VoteDirection};
    use tp_03_vote_ledger::VoteLedgerApi;
    use tp_05_listing_index::ListingKey;

    #[tokio::test]
    async fn test_scenario_a_b_flip_replay() {
        let pipeline = Pipeline::new();
        let link = pipeline.link(1, 10, 60_000);
        let mut votes = pipeline
            .container
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::Votes]));

        assert_eq!(pipeline.counts(link).await, (0, 0, 0));

        pipeline.cast(1, link, VoteDirection::Up).await.unwrap();
        assert_eq!(pipeline.counts(link).await, (1, 0, 1));

        pipeline.cast(2, link, VoteDirection::Up).await.unwrap();
        assert_eq!(pipeline.counts(link).await, (2, 0, 2));

        pipeline.cast(1, link, VoteDirection::Down).await.unwrap();
        assert_eq!(pipeline.counts(link).await, (1, 1, 0));

        let replay = pipeline.cast(1, link, VoteDirection::Down).await.unwrap();
        assert!(replay.is_none(), "replayed vote must not fan out");
        assert_eq!(pipeline.counts(link).await, (1, 1, 0));

        let events = votes.drain();
        let applied = events
            .iter()
            .filter(|e| matches!(e, PipelineEvent::VoteApplied { .. }))
            .count();
        assert_eq!(applied, 3);
        assert!(matches!(
            events.last(),
            Some(PipelineEvent::VoteNoOp { item_id, voter_id }) if *item_id == link && *voter_id == UserId(1)
        ));

        let stats = pipeline.container.ledger.stats();
        assert_eq!(stats.applied, 3);
        assert_eq!(stats.noops, 1);
    }

    #[tokio::test]
    async fn test_up_then_none_round_trips() {
        let pipeline = Pipeline::new();
        let link = pipeline.link(2, 10, 0);

        pipeline.cast(5, link, VoteDirection::Up).await.unwrap();
        pipeline.cast(5, link, VoteDirection::None).await.unwrap();

        let aggregate = pipeline.aggregate(link).await.unwrap();
        assert_eq!((aggregate.ups, aggregate.downs, aggregate.score), (0, 0, 0));
        assert_eq!(
            pipeline
                .container
                .ledger
                .stored_direction(link, UserId(5))
                .await
                .unwrap(),
            VoteDirection::None
        );
    }

    #[tokio::test]
    async fn test_duplicate_votes_apply_once() {
        let pipeline = Pipeline::new();
        let link = pipeline.link(3, 10, 0);

        for _ in 0..5 {
            pipeline.cast(8, link, VoteDirection::Down).await.unwrap();
        }
        assert_eq!(pipeline.counts(link).await, (0, 1, -1));
        assert_eq!(pipeline.container.ledger.stats().noops, 4);
    }

    #[tokio::test]
    async fn test_hot_rank_tracks_score() {
        let pipeline = Pipeline::new();
        let link = pipeline.link(4, 10, 0);

        pipeline.upvotes(link, 1, 3).await;
        let three = pipeline.aggregate(link).await.unwrap().hot_rank;
        pipeline.upvotes(link, 10, 7).await;
        let ten = pipeline.aggregate(link).await.unwrap().hot_rank;
        assert!(ten > three);

        let older = pipeline.link(5, 10, 3_600_000);
        pipeline.upvotes(older, 1, 10).await;
        assert!(pipeline.aggregate(older).await.unwrap().hot_rank < ten);
    }

    #[tokio::test]
    async fn test_unknown_item_is_rejected() {
        let pipeline = Pipeline::new();
        let mut rejected = pipeline
            .container
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::Votes]));

        let err = pipeline
            .cast(1, ItemId(404), VoteDirection::Up)
            .await
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::Malformed);
        assert!(pipeline.aggregate(ItemId(404)).await.is_none());
        assert!(matches!(
            rejected.drain().as_slice(),
            [PipelineEvent::VoteRejected { item_id: ItemId(404), .. }]
        ));
    }

    #[tokio::test]
    async fn test_link_vote_fans_out_to_listings_and_fragments() {
        let pipeline = Pipeline::new();
        let link = pipeline.link(6, 11, 0);
        let listings = ListingKey::vote_sensitive(ContainerId(11)).len();

        let first = pipeline
            .cast(1, link, VoteDirection::Up)
            .await
            .unwrap()
            .unwrap();
        assert!(!first.tree_notified);
        assert_eq!(first.listings_rebuilt, listings);
        assert_eq!(first.fragments_marked, 1 + listings);
        assert_eq!(first.failures, 0);

        // Same instant: every listing is inside its debounce window.
        let second = pipeline
            .cast(2, link, VoteDirection::Up)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.listings_rebuilt, 0);
        assert_eq!(second.listings_deferred, listings);
        assert_eq!(pipeline.container.listings.pending_count(), listings);
    }

    #[tokio::test]
    async fn test_comment_vote_notifies_tree() {
        let pipeline = Pipeline::new();
        let root = pipeline.link(20, 12, 0);
        let comment = pipeline.comment(21, 12, root, None);

        let report = pipeline
            .cast(1, comment, VoteDirection::Up)
            .await
            .unwrap()
            .unwrap();
        assert!(report.tree_notified);
        // Item, listings and the discussion fragment.
        assert_eq!(
            report.fragments_marked,
            2 + ListingKey::vote_sensitive(ContainerId(12)).len()
        );
    }
}
