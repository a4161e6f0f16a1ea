pub mod inbound;
pub mod outbound;

pub use inbound::CacheInvalidation;
pub use outbound::{BatchOperation, CacheStore, KeyValueStore, LockTier};
