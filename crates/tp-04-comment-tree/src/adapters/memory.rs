//! In-memory comment and rank sources.

use crate::ports::{CommentSource, RankSource};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{ItemAggregate, ItemId, ItemInfo, StoreError, UserId};
use std::collections::HashMap;

#[derive(Default)]
pub struct InMemoryCommentSource {
    comments: RwLock<Vec<ItemInfo>>,
    root_authors: RwLock<HashMap<ItemId, UserId>>,
}

impl InMemoryCommentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, info: ItemInfo) {
        self.comments.write().push(info);
    }

    pub fn remove(&self, comment_id: ItemId) {
        self.comments.write().retain(|c| c.item_id != comment_id);
    }

    pub fn set_root_author(&self, root_id: ItemId, author_id: UserId) {
        self.root_authors.write().insert(root_id, author_id);
    }
}

#[async_trait]
impl CommentSource for InMemoryCommentSource {
    async fn comments_for_root(&self, root_id: ItemId) -> Result<Vec<ItemInfo>, StoreError> {
        Ok(self
            .comments
            .read()
            .iter()
            .filter(|c| c.root_id == Some(root_id))
            .cloned()
            .collect())
    }

    async fn root_author(&self, root_id: ItemId) -> Result<Option<UserId>, StoreError> {
        Ok(self.root_authors.read().get(&root_id).copied())
    }
}

#[derive(Default)]
pub struct InMemoryRankSource {
    aggregates: RwLock<HashMap<ItemId, ItemAggregate>>,
}

impl InMemoryRankSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, aggregate: ItemAggregate) {
        self.aggregates.write().insert(aggregate.item_id, aggregate);
    }
}

#[async_trait]
impl RankSource for InMemoryRankSource {
    async fn aggregates(&self, item_ids: &[ItemId]) -> Result<Vec<ItemAggregate>, StoreError> {
        let aggregates = self.aggregates.read();
        Ok(item_ids.iter().filter_map(|id| aggregates.get(id).copied()).collect())
    }
}
