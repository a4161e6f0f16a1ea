use shared_types::{Classify, ErrorClass, ItemId, StoreError};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("lock {key} still held after {attempts} attempts")]
    LockContention { key: String, attempts: u32 },

    /// A rank-only pass named a comment the stored tree does not contain.
    #[error("comment {comment_id} is not linked under root {root_id}")]
    UnknownComment { root_id: ItemId, comment_id: ItemId },
}

impl Classify for TreeError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Store(e) => e.class(),
            Self::LockContention { .. } => ErrorClass::LockContention,
            Self::UnknownComment { .. } => ErrorClass::Malformed,
        }
    }
}
