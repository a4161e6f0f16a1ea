//! # Inbound Port - CacheInvalidation
//!
//! The invalidation half of the cache API, as seen by the Vote Consumer fan-out.
//! Reads go through [`crate::CacheManager`] directly because they are generic
//! over the caller's compute function.
//!
//! Every operation is idempotent: a consumer that crashes after fan-out and
//! redelivers the vote repeats them harmlessly.

use async_trait::async_trait;

#[async_trait]
pub trait CacheInvalidation: Send + Sync {
    /// Drop `key` from the volatile tier, and from the durable tier when
    /// `durable` is set.
    async fn invalidate(&self, key: &str, durable: bool);

    /// Move the current value for `key` into the stale tier so readers keep
    /// getting the old rendering until the next recompute. Any durable copy
    /// is dropped so the next read recomputes.
    async fn mark_stale(&self, key: &str);
}
