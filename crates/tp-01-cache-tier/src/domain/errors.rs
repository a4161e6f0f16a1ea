//! Cache tier errors.

use shared_types::{Classify, ErrorClass, StoreError};
use thiserror::Error;

/// Errors raised inside the cache tier.
///
/// None of these reach a reader of [`crate::CacheManager::get_or_compute`]:
/// reads degrade to stale data or a placeholder instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// Durable tier failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The caller-supplied compute function failed.
    #[error("compute failed for {key}: {message}")]
    Compute { key: String, message: String },

    /// Stored durable record could not be decoded.
    #[error("corrupt durable record for {key}: {message}")]
    Corrupt { key: String, message: String },

    /// Counter operation on a non-numeric value.
    #[error("value at {0} is not a counter")]
    NotACounter(String),

    /// Invalid configuration.
    #[error("invalid cache config: {0}")]
    Config(String),
}

impl CacheError {
    pub fn compute(key: &str, message: impl Into<String>) -> Self {
        Self::Compute {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

impl Classify for CacheError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Store(e) => e.class(),
            Self::Compute { .. } => ErrorClass::TransientStoreError,
            Self::Corrupt { .. } | Self::NotACounter(_) => ErrorClass::CorruptAggregate,
            Self::Config(_) => ErrorClass::Malformed,
        }
    }
}
