//! # Inbound Port - VoteLedgerApi
//!
//! Driving port used by the Vote Consumer Pool.

use crate::domain::{LedgerError, LedgerOutcome};
use async_trait::async_trait;
use shared_types::{ItemAggregate, ItemId, UserId, Vote, VoteDirection};

#[async_trait]
pub trait VoteLedgerApi: Send + Sync {
    /// Apply `vote` under the item's RecomputeLock.
    ///
    /// ## Errors
    ///
    /// - `ItemNotFound`: the directory does not know the target
    /// - `CorruptAggregate`: the stored aggregate failed verification; the
    ///   item is now quarantined
    /// - `Quarantined`: the item was quarantined by an earlier vote
    /// - `LockContention`, `Store`: retry later
    async fn apply_vote(&self, vote: &Vote) -> Result<LedgerOutcome, LedgerError>;

    /// Current aggregate snapshot, `None` if the item has never been voted on.
    async fn aggregate(&self, item_id: ItemId) -> Result<Option<ItemAggregate>, LedgerError>;

    /// Last stored direction of `voter_id` on `item_id`.
    async fn stored_direction(&self, item_id: ItemId, voter_id: UserId) -> Result<VoteDirection, LedgerError>;
}
