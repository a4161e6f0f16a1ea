//! Ranking service implementing [`RankingApi`].

use crate::domain::{confidence, controversy, hot, qa, qa_from_scores, score, QaPost};
use crate::ports::RankingApi;
use shared_types::{ItemAggregate, SortOrder, Timestamp};

/// Stateless ranking engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankingEngine;

impl RankingEngine {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl RankingApi for RankingEngine {
    fn recompute(&self, aggregate: &ItemAggregate, ups: u64, downs: u64, now: Timestamp) -> ItemAggregate {
        ItemAggregate {
            item_id: aggregate.item_id,
            ups,
            downs,
            score: score(ups, downs),
            hot_rank: hot(ups, downs, aggregate.created_at),
            controversy: controversy(ups, downs),
            confidence: confidence(ups, downs),
            created_at: aggregate.created_at,
            last_recomputed_at: now,
        }
    }

    fn rank_value(&self, sort: SortOrder, aggregate: &ItemAggregate) -> f64 {
        match sort {
            SortOrder::Hot => aggregate.hot_rank,
            SortOrder::Top => aggregate.score as f64,
            SortOrder::Controversial => aggregate.controversy,
            SortOrder::New => aggregate.created_at as f64,
            SortOrder::Best => aggregate.confidence,
            SortOrder::Qa => qa_from_scores(aggregate.confidence, 0, None),
        }
    }

    fn qa_rank(&self, question: QaPost, answers: &[QaPost]) -> f64 {
        qa(question, answers)
    }

    fn is_consistent(&self, aggregate: &ItemAggregate) -> bool {
        let (ups, downs) = (aggregate.ups, aggregate.downs);
        aggregate.score == score(ups, downs)
            && aggregate.hot_rank.to_bits() == hot(ups, downs, aggregate.created_at).to_bits()
            && aggregate.controversy.to_bits() == controversy(ups, downs).to_bits()
            && aggregate.confidence.to_bits() == confidence(ups, downs).to_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ItemId;

    #[test]
    fn test_recompute_fills_derived_values() {
        let engine = RankingEngine::new();
        let base = ItemAggregate::empty(ItemId(1), 1_600_000_000_000);
        let agg = engine.recompute(&base, 10, 10, 1_600_000_100_000);

        assert_eq!(agg.counts(), (10, 10, 0));
        assert_eq!(agg.controversy, 20.0);
        assert_eq!(agg.hot_rank, hot(10, 10, base.created_at));
        assert_eq!(agg.last_recomputed_at, 1_600_000_100_000);
        assert!(engine.is_consistent(&agg));
    }

    #[test]
    fn test_tampered_aggregate_is_inconsistent() {
        let engine = RankingEngine::new();
        let base = ItemAggregate::empty(ItemId(1), 1_600_000_000_000);
        let mut agg = engine.recompute(&base, 3, 1, 1);
        agg.score = 5;
        assert!(!engine.is_consistent(&agg));
    }

    #[test]
    fn test_rank_value_per_sort() {
        let engine = RankingEngine::new();
        let base = ItemAggregate::empty(ItemId(1), 1_600_000_000_000);
        let agg = engine.recompute(&base, 4, 1, 1);

        assert_eq!(engine.rank_value(SortOrder::Top, &agg), 3.0);
        assert_eq!(engine.rank_value(SortOrder::Hot, &agg), agg.hot_rank);
        assert_eq!(engine.rank_value(SortOrder::New, &agg), 1_600_000_000_000.0);
        assert_eq!(engine.rank_value(SortOrder::Best, &agg), agg.confidence);
        assert_eq!(engine.rank_value(SortOrder::Qa, &agg), agg.confidence);
    }
}
