//! Durable-tier record format.
//!
//! Durable entries carry their own expiry so a persistent backend without
//! native TTL support can still honour it. Records are bincode-encoded.

use super::entities::CacheValue;
use super::errors::CacheError;
use serde::{Deserialize, Serialize};
use shared_types::Timestamp;

/// Record version written by this build.
pub const RECORD_VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurableRecord {
    pub version: u8,
    pub value: CacheValue,
    pub expires_at: Timestamp,
    pub write_generation: u64,
}

impl DurableRecord {
    pub fn new(value: CacheValue, expires_at: Timestamp, write_generation: u64) -> Self {
        Self {
            version: RECORD_VERSION,
            value,
            expires_at,
            write_generation,
        }
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }

    pub fn encode(&self) -> Result<Vec<u8>, CacheError> {
        bincode::serialize(self).map_err(|e| CacheError::Corrupt {
            key: String::new(),
            message: e.to_string(),
        })
    }

    pub fn decode(key: &str, bytes: &[u8]) -> Result<Self, CacheError> {
        let record: Self = bincode::deserialize(bytes).map_err(|e| CacheError::Corrupt {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        if record.version != RECORD_VERSION {
            return Err(CacheError::Corrupt {
                key: key.to_string(),
                message: format!("unsupported record version {}", record.version),
            });
        }
        Ok(record)
    }

    /// Interpret the value as a decimal counter.
    pub fn counter(&self, key: &str) -> Result<i64, CacheError> {
        self.value
            .as_bytes()
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
            .and_then(|s| s.trim().parse::<i64>().ok())
            .ok_or_else(|| CacheError::NotACounter(key.to_string()))
    }
}
