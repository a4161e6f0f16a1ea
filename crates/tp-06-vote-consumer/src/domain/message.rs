//! Queue message schema.
//!
//! JSON objects tagged by `type`:
//!
//! ```json
//! {"type":"vote","voter_id":7,"item_id":42,"direction":"up","submitted_at":1700000000000}
//! {"type":"tree_rebuild","root_id":42}
//! {"type":"listing_rebuild","container_id":3,"sort":"hot","window":"day"}
//! {"type":"listing_sweep"}
//! ```

use super::errors::ConsumerError;
use serde::{Deserialize, Serialize};
use shared_types::{ContainerId, ItemId, SortOrder, TimeWindow, Timestamp, UserId, Vote, VoteDirection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueMessage {
    Vote {
        voter_id: UserId,
        item_id: ItemId,
        direction: VoteDirection,
        submitted_at: Timestamp,
    },
    TreeRebuild {
        root_id: ItemId,
    },
    /// A missing sort or window means every one.
    ListingRebuild {
        container_id: ContainerId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sort: Option<SortOrder>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        window: Option<TimeWindow>,
    },
    ListingSweep,
}

impl QueueMessage {
    pub fn vote(vote: &Vote) -> Self {
        Self::Vote {
            voter_id: vote.voter_id,
            item_id: vote.item_id,
            direction: vote.direction,
            submitted_at: vote.submitted_at,
        }
    }

    /// Parse and validate a delivery body.
    pub fn decode(bytes: &[u8]) -> Result<Self, ConsumerError> {
        let message: Self = serde_json::from_slice(bytes).map_err(|e| ConsumerError::malformed(e.to_string()))?;
        message.validate()?;
        Ok(message)
    }

    pub fn encode(&self) -> Result<Vec<u8>, ConsumerError> {
        serde_json::to_vec(self).map_err(|e| ConsumerError::malformed(e.to_string()))
    }

    fn validate(&self) -> Result<(), ConsumerError> {
        match self {
            Self::Vote { voter_id, item_id, .. } if voter_id.0 == 0 || item_id.0 == 0 => {
                Err(ConsumerError::malformed("vote with zero id"))
            }
            Self::TreeRebuild { root_id } if root_id.0 == 0 => Err(ConsumerError::malformed("tree rebuild of item 0")),
            _ => Ok(()),
        }
    }

    pub fn as_vote(&self) -> Option<Vote> {
        match *self {
            Self::Vote {
                voter_id,
                item_id,
                direction,
                submitted_at,
            } => Some(Vote::new(voter_id, item_id, direction, submitted_at)),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Vote { .. } => "vote",
            Self::TreeRebuild { .. } => "tree_rebuild",
            Self::ListingRebuild { .. } => "listing_rebuild",
            Self::ListingSweep => "listing_sweep",
        }
    }
}
