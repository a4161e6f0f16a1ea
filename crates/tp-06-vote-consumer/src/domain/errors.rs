//! Consumer and queue errors.

use shared_types::{Classify, ErrorClass, StoreError};
use thiserror::Error;
use tp_03_vote_ledger::LedgerError;
use tp_04_comment_tree::TreeError;
use tp_05_listing_index::ListingError;
use uuid::Uuid;

/// Failures of the queue backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue unavailable: {0}")]
    Unavailable(String),

    /// Ack, nack or dead-letter for a delivery that is not in flight.
    #[error("unknown delivery {0}")]
    UnknownDelivery(Uuid),
}

impl Classify for QueueError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Unavailable(_) => ErrorClass::QueueUnavailable,
            Self::UnknownDelivery(_) => ErrorClass::Malformed,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConsumerError {
    /// Undecodable or invalid message body.
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Listing(#[from] ListingError),

    /// Directory lookup during fan-out.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ConsumerError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed(reason.into())
    }
}

impl Classify for ConsumerError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Malformed(_) => ErrorClass::Malformed,
            Self::Queue(e) => e.class(),
            Self::Ledger(e) => e.class(),
            Self::Tree(e) => e.class(),
            Self::Listing(e) => e.class(),
            Self::Store(e) => e.class(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ItemId;

    #[test]
    fn test_classification_delegates() {
        assert_eq!(ConsumerError::malformed("bad json").class(), ErrorClass::Malformed);
        assert_eq!(
            ConsumerError::from(QueueError::Unavailable("down".into())).class(),
            ErrorClass::QueueUnavailable
        );
        assert_eq!(
            ConsumerError::from(LedgerError::Quarantined(ItemId(3))).class(),
            ErrorClass::CorruptAggregate
        );
        assert_eq!(
            ConsumerError::from(StoreError::Timeout { millis: 5 }).class(),
            ErrorClass::TransientStoreError
        );
    }
}
