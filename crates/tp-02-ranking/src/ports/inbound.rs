//! # Inbound Port - RankingApi
//!
//! Driving port used by the Vote Ledger (to recompute aggregates under the
//! item lock) and by the Comment-Tree Maintainer and Listing Index (to read
//! the sort key of an aggregate).

use crate::domain::QaPost;
use shared_types::{ItemAggregate, SortOrder, Timestamp};

/// Ranking operations over an aggregate.
pub trait RankingApi: Send + Sync {
    /// Return `aggregate` with new vote totals and every derived value
    /// recomputed. `now` becomes `last_recomputed_at`.
    fn recompute(&self, aggregate: &ItemAggregate, ups: u64, downs: u64, now: Timestamp) -> ItemAggregate;

    /// Sort key of `aggregate` under `sort`. Higher ranks first. Under
    /// `Qa` this is the rank of an unanswered question with no text.
    fn rank_value(&self, sort: SortOrder, aggregate: &ItemAggregate) -> f64;

    /// `Qa` sort key of `question` given the replies that count as answers.
    fn qa_rank(&self, question: QaPost, answers: &[QaPost]) -> f64;

    /// Whether the stored derived values agree with the formulas.
    fn is_consistent(&self, aggregate: &ItemAggregate) -> bool;
}
