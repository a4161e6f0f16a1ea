use shared_types::{Classify, ErrorClass, StoreError};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ListingError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("lock {key} still held after {attempts} attempts")]
    LockContention { key: String, attempts: u32 },
}

impl Classify for ListingError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Store(e) => e.class(),
            Self::LockContention { .. } => ErrorClass::LockContention,
        }
    }
}
