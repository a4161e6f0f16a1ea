//! # TP-01 Cache Tier
//!
//! Four-tier cache that serializes expensive recomputation and keeps serving
//! fragments while a recomputation is in flight.
//!
//! ## Tiers
//!
//! | Tier | Backing | Role |
//! |------|---------|------|
//! | Lock | `DashMap` | Short-TTL mutual exclusion, never holds data |
//! | Durable | [`KeyValueStore`] (RocksDB in production) | Survives restarts; entries always expire |
//! | Volatile | LRU | Fast path; may drop anything at any time |
//! | Stale | LRU, longer TTL | Old values served under contention or after failures |
//!
//! ## Stampede Protocol
//!
//! Only the lock holder computes. Everyone else gets the stale copy, waits a
//! bounded time for the holder's value, or (as a last resort) computes
//! anyway. A failed computation degrades to stale data or a
//! [`CacheValue::Placeholder`], which the [`PageAssembler`] renders later.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): entries, policies, config, TTL-aware LRU, durable record format
//! - **Ports Layer** (`ports/`): `KeyValueStore`, `LockTier`, `CacheStore`, `CacheInvalidation`
//! - **Adapters Layer** (`adapters/`): in-memory tiers, RocksDB (feature `rocksdb`)
//! - **Service Layer** (`service/`): `CacheManager`, `DurableTier`, `PageAssembler`

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{InMemoryKVStore, InMemoryLockTier, LruCacheStore};
#[cfg(feature = "rocksdb")]
pub use adapters::{RocksDbConfig, RocksDbStore};
pub use domain::*;
pub use ports::{BatchOperation, CacheInvalidation, CacheStore, KeyValueStore, LockTier};
pub use service::{
    call_to_completion, call_with_deadline, AssembledPage, CacheManager, CacheMetrics, CacheStats, DurableTier, FragmentRenderer,
    PageAssembler, PurgeReport, Slot,
};
