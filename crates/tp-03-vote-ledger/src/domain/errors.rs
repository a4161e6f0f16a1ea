//! Vote ledger errors.

use shared_types::{Classify, ErrorClass, ItemId, StoreError};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// Durable store or directory failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The vote targets an item the directory does not know.
    #[error("item not found: {0}")]
    ItemNotFound(ItemId),

    /// The stored aggregate violates its invariants. The item is quarantined.
    #[error("corrupt aggregate for item {item_id}: {reason}")]
    CorruptAggregate { item_id: ItemId, reason: String },

    /// The item was quarantined earlier; votes are refused until released.
    #[error("item {0} is quarantined")]
    Quarantined(ItemId),

    /// The item lock stayed busy for every attempt.
    #[error("lock {key} still held after {attempts} attempts")]
    LockContention { key: String, attempts: u32 },
}

impl Classify for LedgerError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Store(e) => e.class(),
            Self::ItemNotFound(_) => ErrorClass::Malformed,
            Self::CorruptAggregate { .. } | Self::Quarantined(_) => ErrorClass::CorruptAggregate,
            Self::LockContention { .. } => ErrorClass::LockContention,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(LedgerError::ItemNotFound(ItemId(1)).class(), ErrorClass::Malformed);
        assert_eq!(
            LedgerError::Store(StoreError::Timeout { millis: 10 }).class(),
            ErrorClass::TransientStoreError
        );
        assert_eq!(
            LedgerError::CorruptAggregate {
                item_id: ItemId(1),
                reason: "ups underflow".into()
            }
            .class(),
            ErrorClass::CorruptAggregate
        );
        assert!(LedgerError::LockContention {
            key: "lock:agg:1".into(),
            attempts: 3
        }
        .class()
        .is_retryable());
    }
}
