use super::ledger_to_store;
use async_trait::async_trait;
use shared_types::{ItemAggregate, ItemId, StoreError};
use std::sync::Arc;
use tp_03_vote_ledger::VoteLedger;
use tp_04_comment_tree::RankSource;

/// Comment ranks for the tree maintainer, read from the ledger.
pub struct LedgerRankSource {
    ledger: Arc<VoteLedger>,
}

impl LedgerRankSource {
    pub fn new(ledger: Arc<VoteLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl RankSource for LedgerRankSource {
    async fn aggregates(&self, item_ids: &[ItemId]) -> Result<Vec<ItemAggregate>, StoreError> {
        self.ledger.aggregates(item_ids).await.map_err(ledger_to_store)
    }
}
