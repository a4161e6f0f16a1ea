//! # Inbound Port - CommentTreeApi
//!
//! Driven by the Vote Consumer fan-out and the `maintenance.tree_rebuild`
//! queue. Notifications run the pass on the calling task unless a pass for
//! the same root is already in flight, in which case they coalesce into it.

use crate::domain::{CommentTree, TreeError, TreeState};
use async_trait::async_trait;
use shared_types::ItemId;

#[async_trait]
pub trait CommentTreeApi: Send + Sync {
    /// A comment was added or removed under `root_id`.
    async fn notify_structural(&self, root_id: ItemId) -> Result<(), TreeError>;

    /// The votes on `comment_id` changed.
    async fn notify_vote(&self, root_id: ItemId, comment_id: ItemId) -> Result<(), TreeError>;

    /// Stored tree for `root_id`.
    async fn tree(&self, root_id: ItemId) -> Result<Option<CommentTree>, TreeError>;

    /// Current maintenance state of `root_id`.
    fn state(&self, root_id: ItemId) -> TreeState;

    /// Drive roots parked after repeated failed passes. Returns how many
    /// came back clean.
    async fn retry_parked(&self) -> usize {
        0
    }
}
