//! Cache entities: values, entries, tiers, locks and fetch results.

use serde::{Deserialize, Serialize};
use shared_types::Timestamp;
use std::fmt;
use uuid::Uuid;

/// What a cache slot holds.
///
/// `Placeholder` marks a fragment whose computation was requested but has not
/// finished. Page assemblers render it later instead of treating it as an
/// error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheValue {
    Value(Vec<u8>),
    Placeholder,
}

impl CacheValue {
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder)
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Value(bytes) => Some(bytes),
            Self::Placeholder => None,
        }
    }

    #[must_use]
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Self::Value(bytes) => Some(bytes),
            Self::Placeholder => None,
        }
    }
}

/// The four cache tiers, in increasing durability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    Lock,
    Durable,
    Volatile,
    Stale,
}

impl Tier {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lock => "lock",
            Self::Durable => "durable",
            Self::Volatile => "volatile",
            Self::Stale => "stale",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value as stored in one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: CacheValue,
    pub tier: Tier,
    pub ttl_ms: u64,
    pub write_generation: u64,
    pub written_at: Timestamp,
}

impl CacheEntry {
    #[must_use]
    pub fn expires_at(&self) -> Timestamp {
        self.written_at.saturating_add(self.ttl_ms)
    }

    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at()
    }

    /// Copy of this entry re-homed into another tier.
    #[must_use]
    pub fn mirrored(&self, tier: Tier, ttl_ms: u64, now: Timestamp) -> Self {
        Self {
            key: self.key.clone(),
            value: self.value.clone(),
            tier,
            ttl_ms,
            write_generation: self.write_generation,
            written_at: now,
        }
    }
}

/// Mutual-exclusion token held in the lock tier.
///
/// Expires unconditionally at `acquired_at + ttl_ms`, whether or not the
/// holder is still alive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecomputeLock {
    pub key: String,
    pub owner_token: Uuid,
    pub acquired_at: Timestamp,
    pub ttl_ms: u64,
}

impl RecomputeLock {
    #[must_use]
    pub fn new(key: impl Into<String>, acquired_at: Timestamp, ttl_ms: u64) -> Self {
        Self {
            key: key.into(),
            owner_token: Uuid::new_v4(),
            acquired_at,
            ttl_ms,
        }
    }

    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.acquired_at.saturating_add(self.ttl_ms)
    }
}

/// Per-call caching policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CachePolicy {
    /// Also persist to (and read from) the durable tier.
    pub durable: bool,
    /// Override of the configured volatile TTL.
    pub volatile_ttl_ms: Option<u64>,
}

impl CachePolicy {
    /// Volatile + stale only.
    #[must_use]
    pub fn volatile() -> Self {
        Self::default()
    }

    /// Expensive, rarely-changing fragments.
    #[must_use]
    pub fn durable() -> Self {
        Self {
            durable: true,
            volatile_ttl_ms: None,
        }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl_ms: u64) -> Self {
        self.volatile_ttl_ms = Some(ttl_ms);
        self
    }
}

/// Where a fetched value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Computed by this call.
    Fresh,
    /// Served from the volatile or durable tier.
    Cached,
    /// Served from the stale tier while another worker recomputes, or after
    /// a failed computation.
    Stale,
    /// Nothing available; render later.
    Placeholder,
}

/// Result of a cache read. Reads never fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub value: CacheValue,
    pub freshness: Freshness,
}

impl Fetched {
    #[must_use]
    pub fn new(value: CacheValue, freshness: Freshness) -> Self {
        Self { value, freshness }
    }

    #[must_use]
    pub fn placeholder() -> Self {
        Self::new(CacheValue::Placeholder, Freshness::Placeholder)
    }

    #[must_use]
    pub fn bytes(&self) -> Option<&[u8]> {
        self.value.as_bytes()
    }
}
