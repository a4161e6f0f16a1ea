//! # Core Domain Entities
//!
//! Defines the entities that flow through the vote pipeline.
//!
//! ## Clusters
//!
//! - **Identity**: `ItemId`, `UserId`, `ContainerId`
//! - **Votes**: `Vote`, `VoteDirection`
//! - **Ranking**: `ItemAggregate`, `SortOrder`, `TimeWindow`
//! - **Directory**: `ItemInfo`, `ItemKind`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

const HOUR_MS: u64 = 60 * 60 * 1000;
const DAY_MS: u64 = 24 * HOUR_MS;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

id_type!(
    /// Identifier of a votable item (link or comment).
    ItemId
);
id_type!(
    /// Identifier of a voting user.
    UserId
);
id_type!(
    /// Identifier of a listing container (community / subreddit-like space).
    ContainerId
);

// =============================================================================
// CLUSTER B: VOTES
// =============================================================================

/// Direction of a vote. `None` withdraws a previous vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
    #[default]
    None,
}

impl VoteDirection {
    /// Contribution of this direction to `(ups, downs)`.
    #[must_use]
    pub fn counts(self) -> (u64, u64) {
        match self {
            Self::Up => (1, 0),
            Self::Down => (0, 1),
            Self::None => (0, 0),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::None => "none",
        }
    }
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single user's vote on an item.
///
/// Unique per `(voter_id, item_id)`: a newer vote for the same pair
/// supersedes the stored one in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub voter_id: UserId,
    pub item_id: ItemId,
    pub direction: VoteDirection,
    pub submitted_at: Timestamp,
}

impl Vote {
    #[must_use]
    pub fn new(voter_id: UserId, item_id: ItemId, direction: VoteDirection, submitted_at: Timestamp) -> Self {
        Self {
            voter_id,
            item_id,
            direction,
            submitted_at,
        }
    }
}

// =============================================================================
// CLUSTER C: RANKING
// =============================================================================

/// Current vote totals and derived rank values of one item.
///
/// `score`, `hot_rank`, `controversy` and `confidence` are pure functions of
/// `(ups, downs, created_at)`; they are stored to avoid recomputation on read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemAggregate {
    pub item_id: ItemId,
    pub ups: u64,
    pub downs: u64,
    pub score: i64,
    pub hot_rank: f64,
    pub controversy: f64,
    pub confidence: f64,
    pub created_at: Timestamp,
    pub last_recomputed_at: Timestamp,
}

impl ItemAggregate {
    /// An aggregate with no votes. Derived ranks are left at zero until the
    /// ranking engine fills them in.
    #[must_use]
    pub fn empty(item_id: ItemId, created_at: Timestamp) -> Self {
        Self {
            item_id,
            ups: 0,
            downs: 0,
            score: 0,
            hot_rank: 0.0,
            controversy: 0.0,
            confidence: 0.0,
            created_at,
            last_recomputed_at: created_at,
        }
    }

    /// Vote totals only, ignoring the timestamp of the last recompute.
    #[must_use]
    pub fn counts(&self) -> (u64, u64, i64) {
        (self.ups, self.downs, self.score)
    }
}

/// Sort orders a listing or comment tree can be ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Hot,
    Top,
    Controversial,
    New,
    Best,
    /// Question-and-answer order for comment trees: a comment ranks by its
    /// own confidence plus that of the best reply from the link's author,
    /// with a small bonus for longer text.
    Qa,
}

impl SortOrder {
    /// Sorts listings are built under. `Qa` needs reply structure and only
    /// orders comment trees.
    pub const ALL: [SortOrder; 5] = [
        SortOrder::Hot,
        SortOrder::Top,
        SortOrder::Controversial,
        SortOrder::New,
        SortOrder::Best,
    ];

    /// Sorts whose order can change when a vote lands. `New` depends only on
    /// creation time.
    pub const VOTE_SENSITIVE: [SortOrder; 4] = [
        SortOrder::Hot,
        SortOrder::Top,
        SortOrder::Controversial,
        SortOrder::Best,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::Top => "top",
            Self::Controversial => "controversial",
            Self::New => "new",
            Self::Best => "best",
            Self::Qa => "qa",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hot" => Ok(Self::Hot),
            "top" => Ok(Self::Top),
            "controversial" => Ok(Self::Controversial),
            "new" => Ok(Self::New),
            "best" => Ok(Self::Best),
            "qa" => Ok(Self::Qa),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Time window a listing covers, measured back from "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Hour,
    Day,
    Week,
    Month,
    Year,
    All,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 6] = [
        TimeWindow::Hour,
        TimeWindow::Day,
        TimeWindow::Week,
        TimeWindow::Month,
        TimeWindow::Year,
        TimeWindow::All,
    ];

    /// Width of the window in milliseconds, `None` for unbounded.
    #[must_use]
    pub fn span_ms(self) -> Option<u64> {
        match self {
            Self::Hour => Some(HOUR_MS),
            Self::Day => Some(DAY_MS),
            Self::Week => Some(7 * DAY_MS),
            Self::Month => Some(30 * DAY_MS),
            Self::Year => Some(365 * DAY_MS),
            Self::All => None,
        }
    }

    /// Earliest creation time that still falls inside the window.
    #[must_use]
    pub fn cutoff(self, now: Timestamp) -> Timestamp {
        self.span_ms().map_or(0, |span| now.saturating_sub(span))
    }

    /// Whether an item created at `created_at` is inside the window.
    #[must_use]
    pub fn contains(self, created_at: Timestamp, now: Timestamp) -> bool {
        created_at >= self.cutoff(now)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
            Self::All => "all",
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            "all" => Ok(Self::All),
            other => Err(format!("unknown time window: {other}")),
        }
    }
}

// =============================================================================
// CLUSTER D: DIRECTORY
// =============================================================================

/// Kind of votable item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Link,
    Comment,
}

/// Read-only facts about an item, as held by the durable account store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInfo {
    pub item_id: ItemId,
    pub kind: ItemKind,
    pub container_id: ContainerId,
    /// Discussion root (the link) for comments, `None` for links.
    pub root_id: Option<ItemId>,
    /// Parent comment; `None` for links and top-level comments.
    pub parent_id: Option<ItemId>,
    pub author_id: UserId,
    pub created_at: Timestamp,
    /// Length of the item's text in bytes.
    #[serde(default)]
    pub body_len: usize,
}

impl ItemInfo {
    #[must_use]
    pub fn link(item_id: ItemId, container_id: ContainerId, author_id: UserId, created_at: Timestamp) -> Self {
        Self {
            item_id,
            kind: ItemKind::Link,
            container_id,
            root_id: None,
            parent_id: None,
            author_id,
            created_at,
            body_len: 0,
        }
    }

    #[must_use]
    pub fn comment(
        item_id: ItemId,
        container_id: ContainerId,
        root_id: ItemId,
        parent_id: Option<ItemId>,
        author_id: UserId,
        created_at: Timestamp,
    ) -> Self {
        Self {
            item_id,
            kind: ItemKind::Comment,
            container_id,
            root_id: Some(root_id),
            parent_id,
            author_id,
            created_at,
            body_len: 0,
        }
    }

    #[must_use]
    pub fn with_body_len(mut self, body_len: usize) -> Self {
        self.body_len = body_len;
        self
    }

    #[must_use]
    pub fn is_comment(&self) -> bool {
        self.kind == ItemKind::Comment
    }
}
