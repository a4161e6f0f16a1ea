//! # Comment-Tree Flow
//!
//! Comment votes reach the tree maintainer through the consumer fan-out.
//! A rank-only change re-sorts the affected sibling lists; a structural
//! change (or a missing tree) triggers a full rebuild.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::Pipeline;
    use shared_bus::{EventFilter, EventTopic, PipelineEvent, TreePass};
    use shared_types::{ItemId, VoteDirection};
    use tp_04_comment_tree::{CommentTree, CommentTreeApi, TreeState};

    const CONTAINER: u64 = 30;

    /// Root 100 with top-level comments 101, 102, 103 and reply 104 under
    /// 101. Scores: 101 = 3, 102 = 1, 103 = 2, 104 = 2.
    async fn discussion(pipeline: &Pipeline) -> ItemId {
        let root = pipeline.link(100, CONTAINER, 0);
        let c1 = pipeline.comment(101, CONTAINER, root, None);
        let c2 = pipeline.comment(102, CONTAINER, root, None);
        let c3 = pipeline.comment(103, CONTAINER, root, None);
        let reply = pipeline.comment(104, CONTAINER, root, Some(101));

        pipeline.container.trees.notify_structural(root).await.unwrap();

        pipeline.upvotes(c1, 1, 3).await;
        pipeline.upvotes(c2, 4, 1).await;
        pipeline.upvotes(c3, 5, 2).await;
        pipeline.upvotes(reply, 7, 2).await;
        root
    }

    async fn tree(pipeline: &Pipeline, root: ItemId) -> CommentTree {
        pipeline.container.trees.tree(root).await.unwrap().unwrap()
    }

    fn ids(raw: &[u64]) -> Vec<ItemId> {
        raw.iter().copied().map(ItemId).collect()
    }

    #[tokio::test]
    async fn test_votes_order_siblings() {
        let pipeline = Pipeline::new();
        let root = discussion(&pipeline).await;

        let tree = tree(&pipeline, root).await;
        assert_eq!(tree.top_level, ids(&[101, 103, 102]));
        assert_eq!(tree.children_of(Some(ItemId(101))), ids(&[104]).as_slice());
        assert_eq!(tree.get(ItemId(101)).unwrap().subtree_vote_sum, 5);
        assert!(tree.sums_consistent());
        assert_eq!(pipeline.container.trees.state(root), TreeState::Clean);
    }

    #[tokio::test]
    async fn test_raising_a_comment_resorts() {
        let pipeline = Pipeline::new();
        let root = discussion(&pipeline).await;
        let before = tree(&pipeline, root).await;
        let mut trees = pipeline
            .container
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::Trees]));

        pipeline.upvotes(ItemId(102), 10, 4).await;

        let after = tree(&pipeline, root).await;
        assert_eq!(after.top_level, ids(&[102, 101, 103]));
        assert_eq!(after.get(ItemId(102)).unwrap().score, 5);
        assert_eq!(pipeline.container.trees.state(root), TreeState::Clean);

        // Subtrees the vote did not touch keep their sums.
        for untouched in [101, 103, 104] {
            assert_eq!(
                after.get(ItemId(untouched)).unwrap().subtree_vote_sum,
                before.get(ItemId(untouched)).unwrap().subtree_vote_sum
            );
        }
        assert!(after.sums_consistent());

        let events = trees.drain();
        assert_eq!(events.len(), 4);
        assert!(events.iter().all(|e| matches!(
            e,
            PipelineEvent::TreeUpdated { root_id, pass: TreePass::Resort, nodes: 4 } if *root_id == root
        )));

        let display: Vec<(ItemId, usize)> = after.preorder();
        assert_eq!(
            display,
            vec![
                (ItemId(102), 0),
                (ItemId(101), 0),
                (ItemId(104), 1),
                (ItemId(103), 0),
            ]
        );
    }

    #[tokio::test]
    async fn test_new_comment_needs_rebuild() {
        let pipeline = Pipeline::new();
        let root = discussion(&pipeline).await;
        let mut trees = pipeline
            .container
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::Trees]));

        let late = pipeline.comment(105, CONTAINER, root, Some(103));
        assert!(!tree(&pipeline, root).await.contains(late));

        pipeline.container.trees.notify_structural(root).await.unwrap();

        let tree = tree(&pipeline, root).await;
        assert!(tree.contains(late));
        assert_eq!(tree.len(), 5);
        assert!(matches!(
            trees.drain().as_slice(),
            [PipelineEvent::TreeUpdated { pass: TreePass::Rebuild, nodes: 5, .. }]
        ));
    }

    #[tokio::test]
    async fn test_first_comment_vote_builds_missing_tree() {
        let pipeline = Pipeline::new();
        let root = pipeline.link(200, CONTAINER, 0);
        let comment = pipeline.comment(201, CONTAINER, root, None);
        assert!(pipeline.container.trees.tree(root).await.unwrap().is_none());

        pipeline
            .cast(1, comment, VoteDirection::Down)
            .await
            .unwrap();

        let tree = tree(&pipeline, root).await;
        assert_eq!(tree.top_level, vec![comment]);
        assert_eq!(tree.get(comment).unwrap().score, -1);
    }
}
