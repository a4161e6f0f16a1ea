//! Outbound ports: where comments and their current aggregates come from.

use async_trait::async_trait;
use shared_types::{ItemAggregate, ItemId, ItemInfo, StoreError, UserId};

/// The durable account store's list of comments under a root.
#[async_trait]
pub trait CommentSource: Send + Sync {
    async fn comments_for_root(&self, root_id: ItemId) -> Result<Vec<ItemInfo>, StoreError>;

    /// Author of the root link, whose replies count as answers under the
    /// `Qa` sort. `None` when the root is unknown.
    async fn root_author(&self, root_id: ItemId) -> Result<Option<UserId>, StoreError>;
}

/// Current aggregate snapshots (the Vote Ledger in production).
#[async_trait]
pub trait RankSource: Send + Sync {
    /// Aggregates for `item_ids`. Items never voted on are omitted.
    async fn aggregates(&self, item_ids: &[ItemId]) -> Result<Vec<ItemAggregate>, StoreError>;
}
