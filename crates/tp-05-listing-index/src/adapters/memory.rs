use crate::domain::Candidate;
use crate::ports::CandidateSource;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{ContainerId, ItemAggregate, ItemId, StoreError, Timestamp};
use std::collections::BTreeMap;

/// Candidate source over a fixed set of links.
#[derive(Default)]
pub struct InMemoryCandidateSource {
    items: RwLock<BTreeMap<ItemId, (ContainerId, Candidate)>>,
}

impl InMemoryCandidateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, container_id: ContainerId, item_id: ItemId, created_at: Timestamp) {
        self.items.write().insert(
            item_id,
            (
                container_id,
                Candidate {
                    item_id,
                    created_at,
                    aggregate: None,
                },
            ),
        );
    }

    /// Replace the aggregate of a known item. Unknown items are ignored.
    pub fn set_aggregate(&self, aggregate: ItemAggregate) {
        if let Some((_, candidate)) = self.items.write().get_mut(&aggregate.item_id) {
            candidate.aggregate = Some(aggregate);
        }
    }
}

#[async_trait]
impl CandidateSource for InMemoryCandidateSource {
    async fn candidates(&self, container_id: ContainerId, since: Timestamp) -> Result<Vec<Candidate>, StoreError> {
        Ok(self
            .items
            .read()
            .values()
            .filter(|(container, c)| *container == container_id && c.created_at >= since)
            .map(|(_, c)| *c)
            .collect())
    }
}
