//! Tier adapters.

pub mod memory_kv;
pub mod memory_lock;
pub mod memory_store;
#[cfg(feature = "rocksdb")]
pub mod rocksdb_store;

pub use memory_kv::InMemoryKVStore;
pub use memory_lock::InMemoryLockTier;
pub use memory_store::LruCacheStore;
#[cfg(feature = "rocksdb")]
pub use rocksdb_store::{RocksDbConfig, RocksDbStore};
