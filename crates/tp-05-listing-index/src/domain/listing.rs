use serde::{Deserialize, Serialize};
use shared_types::{keys, ContainerId, ItemAggregate, ItemId, SortOrder, StoreError, TimeWindow, Timestamp};
use std::fmt;

/// Identity of one listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListingKey {
    pub container_id: ContainerId,
    pub sort: SortOrder,
    pub window: TimeWindow,
}

impl ListingKey {
    pub fn new(container_id: ContainerId, sort: SortOrder, window: TimeWindow) -> Self {
        Self {
            container_id,
            sort,
            window,
        }
    }

    /// Persisted key, `listing:{container}:{sort}:{window}`.
    pub fn store_key(&self) -> String {
        keys::listing_key(self.container_id, self.sort, self.window)
    }

    /// Every listing of a container whose order a vote can change.
    pub fn vote_sensitive(container_id: ContainerId) -> Vec<ListingKey> {
        SortOrder::VOTE_SENSITIVE
            .iter()
            .flat_map(|sort| TimeWindow::ALL.iter().map(move |window| Self::new(container_id, *sort, *window)))
            .collect()
    }
}

impl ListingKey {
    /// Keys named by a rebuild request; a missing sort or window means all.
    pub fn expand(container_id: ContainerId, sort: Option<SortOrder>, window: Option<TimeWindow>) -> Vec<ListingKey> {
        let sorts = sort.map_or_else(|| SortOrder::ALL.to_vec(), |s| vec![s]);
        let windows = window.map_or_else(|| TimeWindow::ALL.to_vec(), |w| vec![w]);
        sorts
            .iter()
            .flat_map(|sort| windows.iter().map(move |window| Self::new(container_id, *sort, *window)))
            .collect()
    }

    /// Inverse of [`ListingKey::store_key`].
    pub fn parse_store_key(raw: &str) -> Option<Self> {
        let rest = raw.strip_prefix(keys::LISTING_PREFIX)?;
        let mut parts = rest.splitn(3, ':');
        let container_id = ContainerId(parts.next()?.parse().ok()?);
        let sort = parts.next()?.parse().ok()?;
        let window = parts.next()?.parse().ok()?;
        Some(Self::new(container_id, sort, window))
    }
}

impl fmt::Display for ListingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.container_id, self.sort, self.window)
    }
}

/// An item eligible for a listing. `aggregate` is `None` until the item
/// receives its first vote.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub item_id: ItemId,
    pub created_at: Timestamp,
    pub aggregate: Option<ItemAggregate>,
}

/// A built listing (the persisted `ListingEntry`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub key: ListingKey,
    pub item_ids: Vec<ItemId>,
    pub generation: u64,
    pub built_at: Timestamp,
}

impl Listing {
    pub fn encode(&self) -> Result<Vec<u8>, StoreError> {
        bincode::serialize(self).map_err(|e| StoreError::Codec {
            key: self.key.store_key(),
            message: e.to_string(),
        })
    }

    pub fn decode(key: &str, bytes: &[u8]) -> Result<Self, StoreError> {
        bincode::deserialize(bytes).map_err(|e| StoreError::Codec {
            key: key.to_string(),
            message: e.to_string(),
        })
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    pub item_ids: Vec<ItemId>,
    pub next_cursor: Option<String>,
    pub generation: u64,
    /// The supplied cursor was rejected and this is a fresh first page.
    pub restarted: bool,
}

/// Result of a sweep or a pending flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub rebuilt: usize,
    /// Rebuilt too recently; left pending.
    pub deferred: usize,
    /// Rebuild failed; left pending for the next flush.
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_key_layout() {
        let key = ListingKey::new(ContainerId(4), SortOrder::Top, TimeWindow::Week);
        assert_eq!(key.store_key(), "listing:4:top:week");
        assert_eq!(key.to_string(), "4:top:week");
    }

    #[test]
    fn test_vote_sensitive_keys_skip_new() {
        let keys = ListingKey::vote_sensitive(ContainerId(1));
        assert_eq!(keys.len(), SortOrder::VOTE_SENSITIVE.len() * TimeWindow::ALL.len());
        assert!(keys.iter().all(|k| k.sort != SortOrder::New));
    }

    #[test]
    fn test_expand() {
        assert_eq!(ListingKey::expand(ContainerId(1), None, None).len(), 30);
        assert_eq!(
            ListingKey::expand(ContainerId(1), Some(SortOrder::New), Some(TimeWindow::Day)),
            vec![ListingKey::new(ContainerId(1), SortOrder::New, TimeWindow::Day)]
        );
        assert_eq!(ListingKey::expand(ContainerId(1), Some(SortOrder::Hot), None).len(), 6);
    }

    #[test]
    fn test_parse_store_key() {
        let key = ListingKey::new(ContainerId(12), SortOrder::Controversial, TimeWindow::Year);
        assert_eq!(ListingKey::parse_store_key(&key.store_key()), Some(key));
        assert_eq!(ListingKey::parse_store_key("listing:12:rising:all"), None);
        assert_eq!(ListingKey::parse_store_key("agg:12"), None);
    }
}
