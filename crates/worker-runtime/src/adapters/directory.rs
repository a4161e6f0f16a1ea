use super::ledger_to_store;
use async_trait::async_trait;
use shared_types::{ContainerId, ItemId, ItemInfo, ItemKind, StoreError, Timestamp, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tp_03_vote_ledger::{InMemoryItemDirectory, ItemDirectory, VoteLedger};
use tp_04_comment_tree::CommentSource;
use tp_05_listing_index::{Candidate, CandidateSource};

pub struct DirectoryCommentSource {
    directory: Arc<dyn ItemDirectory>,
}

impl DirectoryCommentSource {
    pub fn new(directory: Arc<dyn ItemDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl CommentSource for DirectoryCommentSource {
    async fn comments_for_root(&self, root_id: ItemId) -> Result<Vec<ItemInfo>, StoreError> {
        self.directory.comments_for_root(root_id).await
    }

    async fn root_author(&self, root_id: ItemId) -> Result<Option<UserId>, StoreError> {
        Ok(self.directory.item_info(root_id).await?.map(|info| info.author_id))
    }
}

/// Links of a container with their current aggregates.
///
/// Comments never appear in container listings. Links nobody voted on come
/// back without an aggregate and are ranked as unvoted.
pub struct DirectoryCandidateSource {
    directory: Arc<InMemoryItemDirectory>,
    ledger: Arc<VoteLedger>,
}

impl DirectoryCandidateSource {
    pub fn new(directory: Arc<InMemoryItemDirectory>, ledger: Arc<VoteLedger>) -> Self {
        Self { directory, ledger }
    }
}

#[async_trait]
impl CandidateSource for DirectoryCandidateSource {
    async fn candidates(&self, container_id: ContainerId, since: Timestamp) -> Result<Vec<Candidate>, StoreError> {
        let links: Vec<ItemInfo> = self
            .directory
            .items_in_container(container_id)
            .into_iter()
            .filter(|info| info.kind == ItemKind::Link && info.created_at >= since)
            .collect();
        if links.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<ItemId> = links.iter().map(|info| info.item_id).collect();
        let mut aggregates: HashMap<ItemId, _> = self
            .ledger
            .aggregates(&ids)
            .await
            .map_err(ledger_to_store)?
            .into_iter()
            .map(|agg| (agg.item_id, agg))
            .collect();

        Ok(links
            .into_iter()
            .map(|info| Candidate {
                item_id: info.item_id,
                created_at: info.created_at,
                aggregate: aggregates.remove(&info.item_id),
            })
            .collect())
    }
}
