//! Bounded top-N selection.

use shared_types::ItemId;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Heap entry ordered so that the "best" entry is the greatest: higher rank
/// first, then higher item id (newer items win ties).
#[derive(Debug, Clone, Copy)]
struct Ranked {
    rank: f64,
    item_id: ItemId,
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank
            .total_cmp(&other.rank)
            .then(self.item_id.cmp(&other.item_id))
    }
}

/// The `n` best `(item, rank)` pairs, best first. Keeps at most `n` entries
/// in memory regardless of how many candidates stream through.
pub fn top_n(candidates: impl IntoIterator<Item = (ItemId, f64)>, n: usize) -> Vec<ItemId> {
    if n == 0 {
        return Vec::new();
    }
    let mut heap: BinaryHeap<Reverse<Ranked>> = BinaryHeap::with_capacity(n + 1);
    for (item_id, rank) in candidates {
        let entry = Ranked { rank, item_id };
        if heap.len() < n {
            heap.push(Reverse(entry));
        } else if heap.peek().is_some_and(|Reverse(worst)| entry > *worst) {
            heap.pop();
            heap.push(Reverse(entry));
        }
    }
    let mut best: Vec<Ranked> = heap.into_iter().map(|Reverse(r)| r).collect();
    best.sort_by(|a, b| b.cmp(a));
    best.into_iter().map(|r| r.item_id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_keeps_best_in_order() {
        let ranked = vec![(ItemId(1), 1.0), (ItemId(2), 5.0), (ItemId(3), 3.0), (ItemId(4), 4.0)];
        assert_eq!(top_n(ranked, 2), vec![ItemId(2), ItemId(4)]);
    }

    #[test]
    fn test_ties_prefer_newer_id() {
        let ranked = vec![(ItemId(1), 2.0), (ItemId(9), 2.0), (ItemId(5), 2.0)];
        assert_eq!(top_n(ranked, 3), vec![ItemId(9), ItemId(5), ItemId(1)]);
    }

    #[test]
    fn test_zero_and_short_inputs() {
        assert!(top_n(vec![(ItemId(1), 1.0)], 0).is_empty());
        assert_eq!(top_n(vec![(ItemId(1), 1.0)], 10), vec![ItemId(1)]);
    }

    proptest! {
        #[test]
        fn prop_matches_full_sort(ranks in prop::collection::vec(-1000i32..1000, 0..200), n in 0usize..50) {
            let candidates: Vec<(ItemId, f64)> = ranks
                .iter()
                .enumerate()
                .map(|(i, r)| (ItemId(i as u64), f64::from(*r)))
                .collect();
            let mut sorted = candidates.clone();
            sorted.sort_by(|a, b| b.1.total_cmp(&a.1).then(b.0.cmp(&a.0)));
            let expected: Vec<ItemId> = sorted.into_iter().take(n).map(|(id, _)| id).collect();
            prop_assert_eq!(top_n(candidates, n), expected);
        }
    }
}
