//! # Persisted Key Layout
//!
//! Every key written to the durable, volatile or lock tier is derived here.
//! The layout is part of the on-disk format: aggregates, votes and listings
//! survive redeploys, so these strings must never change once data has been
//! written under them.
//!
//! | Key | Owner |
//! |-----|-------|
//! | `agg:{item_id}` | Vote Ledger |
//! | `vote:{item_id}:{voter_id}` | Vote Ledger |
//! | `tree:{root_id}` | Comment-Tree Maintainer |
//! | `listing:{container}:{sort}:{window}` | Listing Index |
//! | `lock:{key}` | Lock tier |
//! | `frag:{name}` | Rendered fragments |

use crate::entities::{ContainerId, ItemId, SortOrder, TimeWindow, UserId};

pub const AGGREGATE_PREFIX: &str = "agg:";
pub const VOTE_PREFIX: &str = "vote:";
pub const TREE_PREFIX: &str = "tree:";
pub const LISTING_PREFIX: &str = "listing:";
pub const LOCK_PREFIX: &str = "lock:";
pub const FRAGMENT_PREFIX: &str = "frag:";

#[must_use]
pub fn aggregate_key(item_id: ItemId) -> String {
    format!("{AGGREGATE_PREFIX}{item_id}")
}

#[must_use]
pub fn vote_key(item_id: ItemId, voter_id: UserId) -> String {
    format!("{VOTE_PREFIX}{item_id}:{voter_id}")
}

#[must_use]
pub fn tree_key(root_id: ItemId) -> String {
    format!("{TREE_PREFIX}{root_id}")
}

#[must_use]
pub fn listing_key(container_id: ContainerId, sort: SortOrder, window: TimeWindow) -> String {
    format!("{LISTING_PREFIX}{container_id}:{sort}:{window}")
}

/// Lock-tier key guarding recomputation of `key`.
#[must_use]
pub fn lock_key(key: &str) -> String {
    format!("{LOCK_PREFIX}{key}")
}

#[must_use]
pub fn fragment_key(name: &str) -> String {
    format!("{FRAGMENT_PREFIX}{name}")
}

/// Rendered fragment of a single item (its "thing" view).
#[must_use]
pub fn item_fragment_key(item_id: ItemId) -> String {
    fragment_key(&format!("item:{item_id}"))
}

/// Rendered fragment of a discussion tree.
#[must_use]
pub fn tree_fragment_key(root_id: ItemId) -> String {
    fragment_key(&format!("tree:{root_id}"))
}

/// Rendered fragment of one listing.
#[must_use]
pub fn listing_fragment_key(container_id: ContainerId, sort: SortOrder, window: TimeWindow) -> String {
    fragment_key(&format!("listing:{container_id}:{sort}:{window}"))
}
