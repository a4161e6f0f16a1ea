//! Cache tier domain: entities, configuration, the TTL-aware LRU and the
//! durable record format.

pub mod config;
pub mod entities;
pub mod errors;
pub mod record;
pub mod ttl_lru;

pub use config::CacheConfig;
pub use entities::{CacheEntry, CachePolicy, CacheValue, Fetched, Freshness, RecomputeLock, Tier};
pub use errors::CacheError;
pub use record::DurableRecord;
pub use ttl_lru::{LruStats, TtlLru};
