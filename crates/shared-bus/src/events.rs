//! # Pipeline Events
//!
//! Everything a pipeline stage announces after completing a step. Events are
//! notifications only: the queue remains the source of work, so a dropped
//! event never loses a vote.

use serde::{Deserialize, Serialize};
use shared_types::entities::{ContainerId, ItemId, SortOrder, TimeWindow, UserId, VoteDirection};
use std::fmt;

/// Pipeline component that emitted an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    CacheTier,
    Ranking,
    VoteLedger,
    CommentTree,
    ListingIndex,
    VoteConsumer,
    QueueSupervisor,
    Runtime,
}

impl Component {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CacheTier => "cache_tier",
            Self::Ranking => "ranking",
            Self::VoteLedger => "vote_ledger",
            Self::CommentTree => "comment_tree",
            Self::ListingIndex => "listing_index",
            Self::VoteConsumer => "vote_consumer",
            Self::QueueSupervisor => "queue_supervisor",
            Self::Runtime => "runtime",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of comment-tree maintenance pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreePass {
    /// Full relink after a structural change.
    Rebuild,
    /// Sibling re-sort after a rank-only change.
    Resort,
}

/// All events that can be published to the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipelineEvent {
    // =========================================================================
    // VOTE LEDGER
    // =========================================================================
    /// A vote changed an item's aggregate.
    VoteApplied {
        item_id: ItemId,
        voter_id: UserId,
        direction: VoteDirection,
        previous: VoteDirection,
        ups: u64,
        downs: u64,
        score: i64,
        hot_rank: f64,
    },

    /// A replayed or unchanged vote.
    VoteNoOp { item_id: ItemId, voter_id: UserId },

    /// A vote for an unknown or invalid target was dead-lettered.
    VoteRejected { item_id: ItemId, reason: String },

    /// A stored aggregate violated its invariants and was quarantined.
    AggregateQuarantined { item_id: ItemId, reason: String },

    // =========================================================================
    // COMMENT TREE
    // =========================================================================
    /// A discussion tree finished a maintenance pass.
    TreeUpdated {
        root_id: ItemId,
        pass: TreePass,
        nodes: usize,
    },

    // =========================================================================
    // LISTING INDEX
    // =========================================================================
    /// A listing was rebuilt under a new generation token.
    ListingRebuilt {
        container_id: ContainerId,
        sort: SortOrder,
        window: TimeWindow,
        generation: u64,
        items: usize,
    },

    // =========================================================================
    // CACHE TIER
    // =========================================================================
    /// A fragment was dropped (`stale = false`) or demoted to the stale tier.
    CacheInvalidated { key: String, stale: bool },

    // =========================================================================
    // QUEUE SUPERVISOR
    // =========================================================================
    /// A consumer pool started, stopped, resized or was restarted.
    PoolStateChanged {
        queue: String,
        state: String,
        consumers: usize,
    },

    // =========================================================================
    // CRITICAL EVENTS (DLQ)
    // =========================================================================
    /// Failure requiring operator attention.
    CriticalError { component: Component, error: String },
}

impl PipelineEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::VoteApplied { .. } | Self::VoteNoOp { .. } | Self::VoteRejected { .. } => {
                EventTopic::Votes
            }
            Self::TreeUpdated { .. } => EventTopic::Trees,
            Self::ListingRebuilt { .. } => EventTopic::Listings,
            Self::CacheInvalidated { .. } => EventTopic::Cache,
            Self::PoolStateChanged { .. } => EventTopic::Supervisor,
            Self::AggregateQuarantined { .. } | Self::CriticalError { .. } => {
                EventTopic::DeadLetterQueue
            }
        }
    }

    /// Get the originating component.
    #[must_use]
    pub fn source(&self) -> Component {
        match self {
            Self::VoteApplied { .. } | Self::VoteNoOp { .. } | Self::AggregateQuarantined { .. } => {
                Component::VoteLedger
            }
            Self::VoteRejected { .. } => Component::VoteConsumer,
            Self::TreeUpdated { .. } => Component::CommentTree,
            Self::ListingRebuilt { .. } => Component::ListingIndex,
            Self::CacheInvalidated { .. } => Component::CacheTier,
            Self::PoolStateChanged { .. } => Component::QueueSupervisor,
            Self::CriticalError { component, .. } => *component,
        }
    }

    /// Whether this event needs operator attention.
    #[must_use]
    pub fn is_critical(&self) -> bool {
        self.topic() == EventTopic::DeadLetterQueue
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    Votes,
    Trees,
    Listings,
    Cache,
    Supervisor,
    /// Quarantines and critical errors.
    DeadLetterQueue,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Source components to include. Empty means all sources.
    pub sources: Vec<Component>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            sources: Vec::new(),
        }
    }

    /// Create a filter for events from specific components.
    #[must_use]
    pub fn from_components(sources: Vec<Component>) -> Self {
        Self {
            topics: Vec::new(),
            sources,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &PipelineEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let source_match = self.sources.is_empty() || self.sources.contains(&event.source());

        topic_match && source_match
    }
}
