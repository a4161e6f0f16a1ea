//! Persisted ledger records (`vote:{item}:{voter}` and `agg:{item}`),
//! bincode-encoded.

use serde::{Deserialize, Serialize};
use shared_types::{ItemAggregate, StoreError, Timestamp, VoteDirection};

/// Last observed vote of one voter on one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredVote {
    pub direction: VoteDirection,
    pub submitted_at: Timestamp,
}

impl StoredVote {
    pub fn encode(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        bincode::serialize(self).map_err(|e| codec(key, e))
    }

    pub fn decode(key: &str, bytes: &[u8]) -> Result<Self, StoreError> {
        bincode::deserialize(bytes).map_err(|e| codec(key, e))
    }
}

pub fn encode_aggregate(key: &str, aggregate: &ItemAggregate) -> Result<Vec<u8>, StoreError> {
    bincode::serialize(aggregate).map_err(|e| codec(key, e))
}

pub fn decode_aggregate(key: &str, bytes: &[u8]) -> Result<ItemAggregate, StoreError> {
    bincode::deserialize(bytes).map_err(|e| codec(key, e))
}

fn codec(key: &str, err: bincode::Error) -> StoreError {
    StoreError::Codec {
        key: key.to_string(),
        message: err.to_string(),
    }
}
