//! In-memory item directory.
//!
//! Stands in for the durable account store in tests and single-process
//! deployments. Also answers container queries for the listing candidate
//! source.

use crate::ports::ItemDirectory;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{ContainerId, ItemId, ItemInfo, StoreError};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Default)]
pub struct InMemoryItemDirectory {
    items: RwLock<BTreeMap<ItemId, ItemInfo>>,
    failures_pending: AtomicU32,
}

impl InMemoryItemDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, info: ItemInfo) {
        self.items.write().insert(info.item_id, info);
    }

    pub fn remove(&self, item_id: ItemId) -> Option<ItemInfo> {
        self.items.write().remove(&item_id)
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Links and comments posted in `container_id`.
    pub fn items_in_container(&self, container_id: ContainerId) -> Vec<ItemInfo> {
        self.items
            .read()
            .values()
            .filter(|info| info.container_id == container_id)
            .cloned()
            .collect()
    }

    /// Make the next `count` lookups fail with `StoreError::Unavailable`.
    pub fn fail_next(&self, count: u32) {
        self.failures_pending.store(count, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        match self
            .failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        {
            Ok(_) => Err(StoreError::Unavailable("account store unreachable".into())),
            Err(_) => Ok(()),
        }
    }
}

#[async_trait]
impl ItemDirectory for InMemoryItemDirectory {
    async fn item_info(&self, item_id: ItemId) -> Result<Option<ItemInfo>, StoreError> {
        self.check_available()?;
        Ok(self.items.read().get(&item_id).cloned())
    }

    async fn comments_for_root(&self, root_id: ItemId) -> Result<Vec<ItemInfo>, StoreError> {
        self.check_available()?;
        let mut comments: Vec<ItemInfo> = self
            .items
            .read()
            .values()
            .filter(|info| info.is_comment() && info.root_id == Some(root_id))
            .cloned()
            .collect();
        comments.sort_by_key(|info| (info.created_at, info.item_id));
        Ok(comments)
    }
}
