//! Logical queue names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QueueName {
    #[serde(rename = "votes.link")]
    VotesLink,
    #[serde(rename = "votes.comment")]
    VotesComment,
    #[serde(rename = "maintenance.tree_rebuild")]
    TreeRebuild,
    #[serde(rename = "maintenance.listing_rebuild")]
    ListingRebuild,
}

impl QueueName {
    pub const ALL: [QueueName; 4] = [
        QueueName::VotesLink,
        QueueName::VotesComment,
        QueueName::TreeRebuild,
        QueueName::ListingRebuild,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::VotesLink => "votes.link",
            Self::VotesComment => "votes.comment",
            Self::TreeRebuild => "maintenance.tree_rebuild",
            Self::ListingRebuild => "maintenance.listing_rebuild",
        }
    }

    /// Position in [`Self::ALL`].
    pub fn index(self) -> usize {
        match self {
            Self::VotesLink => 0,
            Self::VotesComment => 1,
            Self::TreeRebuild => 2,
            Self::ListingRebuild => 3,
        }
    }

    /// Suffix of the `TIPPR_CONSUMERS_<QUEUE>` override.
    pub fn env_suffix(self) -> &'static str {
        match self {
            Self::VotesLink => "VOTES_LINK",
            Self::VotesComment => "VOTES_COMMENT",
            Self::TreeRebuild => "TREE_REBUILD",
            Self::ListingRebuild => "LISTING_REBUILD",
        }
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|q| q.as_str() == s)
            .ok_or_else(|| format!("unknown queue: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for queue in QueueName::ALL {
            assert_eq!(queue.as_str().parse::<QueueName>(), Ok(queue));
        }
        assert!("votes".parse::<QueueName>().is_err());
    }

    #[test]
    fn test_index_matches_all() {
        for (position, queue) in QueueName::ALL.into_iter().enumerate() {
            assert_eq!(queue.index(), position);
        }
    }

    #[test]
    fn test_serde_uses_queue_names() {
        let json = serde_json::to_string(&QueueName::TreeRebuild).unwrap();
        assert_eq!(json, r#""maintenance.tree_rebuild""#);
        assert_eq!(serde_json::from_str::<QueueName>(r#""votes.comment""#).unwrap(), QueueName::VotesComment);
    }
}
