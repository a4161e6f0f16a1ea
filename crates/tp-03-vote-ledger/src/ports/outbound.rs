//! # Outbound Port - ItemDirectory
//!
//! Read-only view of the durable account store: which items exist, where they
//! live, and which comments hang under a discussion root.

use async_trait::async_trait;
use shared_types::{ItemId, ItemInfo, StoreError};

#[async_trait]
pub trait ItemDirectory: Send + Sync {
    /// Facts about `item_id`, `None` when the item does not exist.
    async fn item_info(&self, item_id: ItemId) -> Result<Option<ItemInfo>, StoreError>;

    /// Every comment under discussion root `root_id`, in creation order.
    async fn comments_for_root(&self, root_id: ItemId) -> Result<Vec<ItemInfo>, StoreError>;
}
