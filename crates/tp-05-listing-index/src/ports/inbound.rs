//! # Inbound Port - ListingApi
//!
//! Read side for the rendering layer, trigger side for the Vote Consumer and
//! the maintenance tasks.

use crate::domain::{Listing, ListingError, ListingKey, ListingPage, SweepReport, Trigger};
use async_trait::async_trait;

#[async_trait]
pub trait ListingApi: Send + Sync {
    /// One page of `key`. A missing listing is built first; an unusable
    /// cursor yields the first page with `restarted` set. A missing listing
    /// that another worker is still building reads as an empty page of
    /// generation 0.
    async fn get_listing_page(
        &self,
        key: ListingKey,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<ListingPage, ListingError>;

    /// Stored listing, without building it.
    async fn listing(&self, key: ListingKey) -> Result<Option<Listing>, ListingError>;

    /// Rebuild `key` now, bypassing the debounce. The key's interval
    /// restarts from this build.
    async fn rebuild(&self, key: ListingKey) -> Result<Listing, ListingError>;

    /// Ask for a rebuild of `key`, subject to the debounce.
    async fn invalidate(&self, key: ListingKey) -> Result<Trigger, ListingError>;

    /// Rebuild pending keys whose debounce interval has elapsed.
    async fn flush_pending(&self) -> SweepReport;

    /// Rebuild every known key, subject to the debounce.
    async fn sweep(&self) -> SweepReport;
}
