//! # Error Types
//!
//! Error classification shared by every pipeline subsystem, plus the storage
//! error returned by all store ports.
//!
//! Each subsystem keeps its own error enum; `Classify` maps it onto the small
//! set of kinds the consumer loop and supervisor act on.

use std::fmt;
use thiserror::Error;

/// How the pipeline reacts to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Network or timeout against a store. Retried with backoff.
    TransientStoreError,
    /// Another worker holds the lock. Control flow, not a failure.
    LockContention,
    /// Replayed vote. No-op.
    DuplicateVote,
    /// Stored data violates an invariant. The key is quarantined.
    CorruptAggregate,
    /// The queue backend is down. The pool stops and is restarted later.
    QueueUnavailable,
    /// Undecodable or semantically invalid input. Dead-lettered.
    Malformed,
}

impl ErrorClass {
    /// Whether a retry of the same work may succeed.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::TransientStoreError | Self::LockContention | Self::QueueUnavailable
        )
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TransientStoreError => "transient_store",
            Self::LockContention => "lock_contention",
            Self::DuplicateVote => "duplicate_vote",
            Self::CorruptAggregate => "corrupt_aggregate",
            Self::QueueUnavailable => "queue_unavailable",
            Self::Malformed => "malformed",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by every subsystem error.
pub trait Classify {
    fn class(&self) -> ErrorClass;
}

/// Errors raised by durable, volatile and lock store adapters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Backend unreachable or returned an I/O failure.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Operation exceeded its deadline.
    #[error("store operation timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// Stored bytes could not be decoded.
    #[error("codec error for key {key}: {message}")]
    Codec { key: String, message: String },

    /// Conditional write lost (e.g. `add` on an existing key).
    #[error("key already exists: {0}")]
    AlreadyExists(String),
}

impl Classify for StoreError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Unavailable(_) | Self::Timeout { .. } => ErrorClass::TransientStoreError,
            Self::Codec { .. } => ErrorClass::CorruptAggregate,
            Self::AlreadyExists(_) => ErrorClass::LockContention,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_classes() {
        assert_eq!(
            StoreError::Timeout { millis: 50 }.class(),
            ErrorClass::TransientStoreError
        );
        assert_eq!(
            StoreError::Codec {
                key: "agg:1".into(),
                message: "eof".into()
            }
            .class(),
            ErrorClass::CorruptAggregate
        );
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorClass::TransientStoreError.is_retryable());
        assert!(!ErrorClass::Malformed.is_retryable());
        assert!(!ErrorClass::CorruptAggregate.is_retryable());
    }
}
