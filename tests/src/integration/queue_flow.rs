//! # Queue Flow
//!
//! End to end through the worker runtime: messages are published on the
//! in-memory queue, supervised consumer pools pick them up, malformed bodies
//! are dead-lettered, and shutdown stops every pool.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{eventually, Pipeline};
    use shared_types::{ContainerId, ItemId, SortOrder, TimeWindow, VoteDirection};
    use std::sync::Arc;
    use tp_03_vote_ledger::VoteLedgerApi;
    use tp_04_comment_tree::CommentTreeApi;
    use tp_05_listing_index::{ListingApi, ListingKey};
    use tp_06_vote_consumer::{InMemoryQueue, MessageQueue, QueueMessage, QueueName};
    use tp_07_queue_supervisor::{PoolState, QueueSupervisorApi};
    use worker_runtime::{PipelineContainer, RuntimeConfig, WorkerRuntime};

    struct Running {
        pipeline: Pipeline,
        runtime: WorkerRuntime,
    }

    impl Running {
        fn container(&self) -> Arc<PipelineContainer> {
            self.runtime.container()
        }

        async fn publish(&self, queue: QueueName, message: QueueMessage) {
            self.pipeline
                .queue
                .publish(queue.as_str(), message.encode().unwrap())
                .await
                .unwrap();
        }
    }

    /// The fixture's directory and clock, with the container handed to a
    /// runtime that owns the consumer pools.
    async fn running() -> Running {
        let (time, queue, backends) = Pipeline::backends();
        let container = PipelineContainer::with_backends(RuntimeConfig::for_testing(), backends).unwrap();
        let runtime = WorkerRuntime::from_container(container);
        runtime.start().await.unwrap();

        // A second handle over the same backends for item registration.
        let pipeline = Pipeline {
            time,
            queue,
            container: PipelineContainer::clone(&runtime.container()),
        };
        Running { pipeline, runtime }
    }

    async fn score(container: &PipelineContainer, item: ItemId) -> i64 {
        container
            .ledger
            .aggregate(item)
            .await
            .unwrap()
            .map_or(0, |agg| agg.score)
    }

    #[tokio::test]
    async fn test_queued_votes_reach_the_ledger() {
        let run = running().await;
        let link = run.pipeline.link(1, 60, 0);

        for voter in 1..=3 {
            let vote = run.pipeline.vote(voter, link, VoteDirection::Up);
            run.publish(QueueName::VotesLink, QueueMessage::vote(&vote)).await;
        }
        let down = run.pipeline.vote(4, link, VoteDirection::Down);
        run.publish(QueueName::VotesLink, QueueMessage::vote(&down)).await;

        let owned = run.container();
        let container: &PipelineContainer = &owned;
        assert!(eventually(|| async move { score(container, link).await == 2 }).await);

        let status = container.supervisor.pool_status(QueueName::VotesLink);
        assert_eq!(status.state, PoolState::Running);
        assert!(eventually(|| async move { container.supervisor.pool_status(QueueName::VotesLink).deliveries.acked == 4 }).await);

        run.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_malformed_body_is_dead_lettered() {
        let run = running().await;
        run.pipeline
            .queue
            .publish(QueueName::VotesLink.as_str(), b"{not json".to_vec())
            .await
            .unwrap();
        let unknown = run.pipeline.vote(1, ItemId(9_404), VoteDirection::Up);
        run.publish(QueueName::VotesLink, QueueMessage::vote(&unknown)).await;

        let queue: &InMemoryQueue = &run.pipeline.queue;
        assert!(eventually(|| async move { queue.dead_letters().len() == 2 }).await);
        for dead in queue.dead_letters() {
            assert_eq!(dead.delivery.queue, QueueName::VotesLink.as_str());
        }
        assert_eq!(queue.in_flight(), 0);

        run.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_comment_votes_and_tree_rebuilds() {
        let run = running().await;
        let root = run.pipeline.link(100, 61, 0);
        let comment = run.pipeline.comment(101, 61, root, None);

        run.publish(QueueName::TreeRebuild, QueueMessage::TreeRebuild { root_id: root })
            .await;
        let owned = run.container();
        let container: &PipelineContainer = &owned;
        assert!(
            eventually(|| async move {
                container
                    .trees
                    .tree(root)
                    .await
                    .unwrap()
                    .is_some_and(|tree| tree.contains(comment))
            })
            .await
        );

        let vote = run.pipeline.vote(7, comment, VoteDirection::Up);
        run.publish(QueueName::VotesComment, QueueMessage::vote(&vote)).await;
        assert!(
            eventually(|| async move {
                container
                    .trees
                    .tree(root)
                    .await
                    .unwrap()
                    .and_then(|tree| tree.get(comment).map(|node| node.score))
                    == Some(1)
            })
            .await
        );

        run.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_listing_requests_rebuild_named_listings() {
        let run = running().await;
        let link = run.pipeline.link(200, 62, 0);
        let key = ListingKey::new(ContainerId(62), SortOrder::New, TimeWindow::Day);

        run.publish(
            QueueName::ListingRebuild,
            QueueMessage::ListingRebuild {
                container_id: ContainerId(62),
                sort: Some(SortOrder::New),
                window: Some(TimeWindow::Day),
            },
        )
        .await;
        let owned = run.container();
        let container: &PipelineContainer = &owned;
        assert!(
            eventually(|| async move {
                container
                    .listings
                    .listing(key)
                    .await
                    .unwrap()
                    .is_some_and(|listing| listing.item_ids == vec![link])
            })
            .await
        );
        let generation = container.listings.listing(key).await.unwrap().unwrap().generation;

        // Past the debounce, a sweep rebuilds every stored listing.
        run.pipeline
            .time
            .advance(container.config.listing.debounce_ms);
        run.publish(QueueName::ListingRebuild, QueueMessage::ListingSweep).await;
        assert!(
            eventually(|| async move {
                container
                    .listings
                    .listing(key)
                    .await
                    .unwrap()
                    .is_some_and(|listing| listing.generation > generation)
            })
            .await
        );

        run.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_every_pool() {
        let run = running().await;
        let owned = run.container();
        let container: &PipelineContainer = &owned;
        assert!(container
            .supervisor
            .status()
            .iter()
            .all(|status| status.state == PoolState::Running));

        run.runtime.shutdown().await;
        run.runtime.shutdown().await;

        assert!(container
            .supervisor
            .status()
            .iter()
            .all(|status| status.state == PoolState::Stopped));
    }
}
