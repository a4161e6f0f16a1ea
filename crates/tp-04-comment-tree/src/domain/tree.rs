//! # Comment Tree
//!
//! Ordered discussion tree below one root link.
//!
//! ## Invariants
//!
//! - Every sibling list (including `top_level`) is ordered by rank
//!   descending, ties broken by ascending comment id.
//! - `subtree_vote_sum` of a node equals its own score plus the
//!   `subtree_vote_sum` of each child.
//! - Every node is reachable from `top_level` exactly once.

use super::errors::TreeError;
use serde::{Deserialize, Serialize};
use shared_types::{ItemId, ItemInfo, SortOrder, StoreError, Timestamp};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Score and sort key of one comment at the time it was read.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeRank {
    pub score: i64,
    pub rank: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentNode {
    pub comment_id: ItemId,
    /// `None` for top-level comments.
    pub parent_id: Option<ItemId>,
    pub root_id: ItemId,
    pub created_at: Timestamp,
    pub score: i64,
    pub rank: f64,
    pub subtree_vote_sum: i64,
    pub children: Vec<ItemId>,
}

/// Flattened view of a tree: ids in display order, depth and parent of each.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TreeDetails {
    pub cids: Vec<ItemId>,
    pub depth: HashMap<ItemId, usize>,
    pub parents: HashMap<ItemId, Option<ItemId>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentTree {
    pub root_id: ItemId,
    pub sort: SortOrder,
    pub top_level: Vec<ItemId>,
    pub nodes: BTreeMap<ItemId, CommentNode>,
}

fn rank_order(a: (f64, ItemId), b: (f64, ItemId)) -> Ordering {
    b.0.total_cmp(&a.0).then(a.1.cmp(&b.1))
}

impl CommentTree {
    pub fn empty(root_id: ItemId, sort: SortOrder) -> Self {
        Self {
            root_id,
            sort,
            top_level: Vec::new(),
            nodes: BTreeMap::new(),
        }
    }

    /// Relink the whole tree from the comment list.
    ///
    /// Comments whose parent is unknown hang at the top level. Comments that
    /// only reach each other through a parent cycle are left out; the second
    /// value is how many were dropped that way.
    pub fn build(
        root_id: ItemId,
        sort: SortOrder,
        comments: &[ItemInfo],
        ranks: &HashMap<ItemId, NodeRank>,
    ) -> (Self, usize) {
        let mut tree = Self::empty(root_id, sort);
        for info in comments.iter().filter(|c| c.root_id == Some(root_id)) {
            let rank = ranks.get(&info.item_id).copied().unwrap_or_default();
            tree.nodes.insert(
                info.item_id,
                CommentNode {
                    comment_id: info.item_id,
                    parent_id: info.parent_id,
                    root_id,
                    created_at: info.created_at,
                    score: rank.score,
                    rank: rank.rank,
                    subtree_vote_sum: rank.score,
                    children: Vec::new(),
                },
            );
        }

        let ids: Vec<ItemId> = tree.nodes.keys().copied().collect();
        for id in &ids {
            let parent = tree.nodes[id]
                .parent_id
                .filter(|p| *p != *id && tree.nodes.contains_key(p));
            if let Some(node) = tree.nodes.get_mut(id) {
                node.parent_id = parent;
            }
            match parent {
                Some(p) => {
                    if let Some(parent_node) = tree.nodes.get_mut(&p) {
                        parent_node.children.push(*id);
                    }
                }
                None => tree.top_level.push(*id),
            }
        }

        let reachable: BTreeSet<ItemId> = tree.preorder().into_iter().map(|(id, _)| id).collect();
        let dropped = tree.nodes.len() - reachable.len();
        if dropped > 0 {
            tree.nodes.retain(|id, _| reachable.contains(id));
        }

        let parents: Vec<Option<ItemId>> = std::iter::once(None)
            .chain(tree.nodes.keys().copied().map(Some))
            .collect();
        for parent in parents {
            tree.sort_siblings(parent);
        }
        tree.recompute_sums();
        (tree, dropped)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, comment_id: ItemId) -> Option<&CommentNode> {
        self.nodes.get(&comment_id)
    }

    pub fn contains(&self, comment_id: ItemId) -> bool {
        self.nodes.contains_key(&comment_id)
    }

    /// Children of `parent`, or the top level for `None`.
    pub fn children_of(&self, parent: Option<ItemId>) -> &[ItemId] {
        match parent {
            None => &self.top_level,
            Some(id) => self.nodes.get(&id).map_or(&[], |n| n.children.as_slice()),
        }
    }

    fn siblings_mut(&mut self, parent: Option<ItemId>) -> Option<&mut Vec<ItemId>> {
        match parent {
            None => Some(&mut self.top_level),
            Some(id) => self.nodes.get_mut(&id).map(|n| &mut n.children),
        }
    }

    fn sort_siblings(&mut self, parent: Option<ItemId>) {
        let keys: HashMap<ItemId, f64> = self
            .children_of(parent)
            .iter()
            .filter_map(|id| self.nodes.get(id).map(|n| (*id, n.rank)))
            .collect();
        if let Some(siblings) = self.siblings_mut(parent) {
            siblings.sort_by(|a, b| rank_order((keys[a], *a), (keys[b], *b)));
        }
    }

    fn recompute_sums(&mut self) {
        let order = self.preorder();
        for (id, _) in order.into_iter().rev() {
            let children_sum: i64 = self.nodes[&id]
                .children
                .iter()
                .map(|c| self.nodes[c].subtree_vote_sum)
                .sum();
            if let Some(node) = self.nodes.get_mut(&id) {
                node.subtree_vote_sum = node.score + children_sum;
            }
        }
    }

    /// Rank-only update.
    ///
    /// Takes fresh values for `affected` comments and their siblings from
    /// `ranks`. Affected nodes get their new score and the delta is added to
    /// `subtree_vote_sum` along their ancestor path; siblings only get their
    /// new rank. Each touched sibling list is then re-sorted. Returns how many
    /// sibling lists were re-sorted.
    pub fn resort(
        &mut self,
        affected: &BTreeSet<ItemId>,
        ranks: &HashMap<ItemId, NodeRank>,
    ) -> Result<usize, TreeError> {
        if let Some(missing) = affected.iter().find(|id| !self.nodes.contains_key(*id)) {
            return Err(TreeError::UnknownComment {
                root_id: self.root_id,
                comment_id: *missing,
            });
        }

        let mut parents = BTreeSet::new();
        for id in affected {
            let node = &self.nodes[id];
            parents.insert(node.parent_id);
            let Some(fresh) = ranks.get(id) else { continue };
            let delta = fresh.score - node.score;

            if let Some(node) = self.nodes.get_mut(id) {
                node.score = fresh.score;
                node.rank = fresh.rank;
            }
            if delta != 0 {
                let mut cursor = Some(*id);
                while let Some(current) = cursor {
                    let Some(node) = self.nodes.get_mut(&current) else { break };
                    node.subtree_vote_sum += delta;
                    cursor = node.parent_id;
                }
            }
        }

        for parent in &parents {
            let siblings = self.children_of(*parent).to_vec();
            for sibling in siblings.iter().filter(|s| !affected.contains(*s)) {
                if let (Some(fresh), Some(node)) = (ranks.get(sibling), self.nodes.get_mut(sibling)) {
                    node.rank = fresh.rank;
                }
            }
            self.sort_siblings(*parent);
        }
        Ok(parents.len())
    }

    /// Depth-first display order with the depth of each comment.
    pub fn preorder(&self) -> Vec<(ItemId, usize)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(ItemId, usize)> = self.top_level.iter().rev().map(|id| (*id, 0)).collect();
        while let Some((id, depth)) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else { continue };
            out.push((id, depth));
            stack.extend(node.children.iter().rev().map(|c| (*c, depth + 1)));
        }
        out
    }

    pub fn details(&self) -> TreeDetails {
        let mut details = TreeDetails::default();
        for (id, depth) in self.preorder() {
            details.cids.push(id);
            details.depth.insert(id, depth);
            details.parents.insert(id, self.nodes[&id].parent_id);
        }
        details
    }

    /// Number of descendants of every comment that has children.
    pub fn descendant_counts(&self) -> HashMap<ItemId, usize> {
        let mut counts: HashMap<ItemId, usize> = HashMap::new();
        for (id, _) in self.preorder().into_iter().rev() {
            let node = &self.nodes[&id];
            if node.children.is_empty() {
                continue;
            }
            let total = node
                .children
                .iter()
                .map(|c| 1 + counts.get(c).copied().unwrap_or(0))
                .sum();
            counts.insert(id, total);
        }
        counts
    }

    /// Whether every stored subtree sum matches its children.
    pub fn sums_consistent(&self) -> bool {
        self.nodes.values().all(|node| {
            let children: i64 = node
                .children
                .iter()
                .filter_map(|c| self.nodes.get(c))
                .map(|c| c.subtree_vote_sum)
                .sum();
            node.subtree_vote_sum == node.score + children
        })
    }

    pub fn encode(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        bincode::serialize(self).map_err(|e| StoreError::Codec {
            key: key.to_string(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use shared_types::{ContainerId, UserId};

    const ROOT: ItemId = ItemId(1);

    fn comment(id: u64, parent: Option<u64>) -> ItemInfo {
        ItemInfo::comment(ItemId(id), ContainerId(1), ROOT, parent.map(ItemId), UserId(1), id)
    }

    fn ranks(pairs: &[(u64, i64, f64)]) -> HashMap<ItemId, NodeRank> {
        pairs
            .iter()
            .map(|(id, score, rank)| (ItemId(*id), NodeRank { score: *score, rank: *rank }))
            .collect()
    }

    fn ids(raw: &[u64]) -> Vec<ItemId> {
        raw.iter().copied().map(ItemId).collect()
    }

    /// C10, C20, C30 at the top; C21 and C22 under C20; C211 under C21.
    fn sample() -> CommentTree {
        let comments = vec![
            comment(10, None),
            comment(20, None),
            comment(30, None),
            comment(21, Some(20)),
            comment(22, Some(20)),
            comment(211, Some(21)),
        ];
        let ranks = ranks(&[
            (10, 3, 3.0),
            (20, 1, 1.0),
            (30, 2, 2.0),
            (21, 4, 4.0),
            (22, 5, 5.0),
            (211, -1, -1.0),
        ]);
        CommentTree::build(ROOT, SortOrder::Hot, &comments, &ranks).0
    }

    #[test]
    fn test_build_orders_siblings_by_rank() {
        let tree = sample();
        assert_eq!(tree.top_level, ids(&[10, 30, 20]));
        assert_eq!(tree.children_of(Some(ItemId(20))), ids(&[22, 21]).as_slice());
        assert!(tree.sums_consistent());
        assert_eq!(tree.get(ItemId(20)).unwrap().subtree_vote_sum, 1 + 4 + 5 - 1);
    }

    #[test]
    fn test_ties_break_by_id() {
        let comments = vec![comment(3, None), comment(2, None)];
        let (tree, _) = CommentTree::build(ROOT, SortOrder::Hot, &comments, &HashMap::new());
        assert_eq!(tree.top_level, ids(&[2, 3]));
    }

    #[test]
    fn test_resort_moves_only_affected_siblings() {
        let mut tree = sample();
        let before_30 = tree.get(ItemId(30)).unwrap().subtree_vote_sum;

        let fresh = ranks(&[(20, 5, 5.0), (10, 3, 3.0), (30, 2, 2.0)]);
        let lists = tree.resort(&BTreeSet::from([ItemId(20)]), &fresh).unwrap();

        assert_eq!(lists, 1);
        assert_eq!(tree.top_level, ids(&[20, 10, 30]));
        assert_eq!(tree.get(ItemId(20)).unwrap().subtree_vote_sum, 5 + 4 + 5 - 1);
        assert_eq!(tree.get(ItemId(30)).unwrap().subtree_vote_sum, before_30);
        assert!(tree.sums_consistent());
    }

    #[test]
    fn test_resort_updates_ancestor_sums() {
        let mut tree = sample();
        let fresh = ranks(&[(211, 6, 6.0)]);
        tree.resort(&BTreeSet::from([ItemId(211)]), &fresh).unwrap();

        assert_eq!(tree.get(ItemId(211)).unwrap().subtree_vote_sum, 6);
        assert_eq!(tree.get(ItemId(21)).unwrap().subtree_vote_sum, 10);
        assert_eq!(tree.get(ItemId(20)).unwrap().subtree_vote_sum, 1 + 10 + 5);
        assert_eq!(tree.get(ItemId(10)).unwrap().subtree_vote_sum, 3);
        assert!(tree.sums_consistent());
    }

    #[test]
    fn test_resort_unknown_comment() {
        let mut tree = sample();
        let err = tree
            .resort(&BTreeSet::from([ItemId(999)]), &HashMap::new())
            .unwrap_err();
        assert_eq!(
            err,
            TreeError::UnknownComment {
                root_id: ROOT,
                comment_id: ItemId(999)
            }
        );
    }

    #[test]
    fn test_orphans_hang_at_top_level() {
        let comments = vec![comment(5, Some(404)), comment(6, Some(5))];
        let (tree, dropped) = CommentTree::build(ROOT, SortOrder::Hot, &comments, &HashMap::new());
        assert_eq!(dropped, 0);
        assert_eq!(tree.top_level, ids(&[5]));
        assert_eq!(tree.children_of(Some(ItemId(5))), ids(&[6]).as_slice());
    }

    #[test]
    fn test_parent_cycle_is_dropped() {
        let comments = vec![comment(5, Some(6)), comment(6, Some(5)), comment(7, None)];
        let (tree, dropped) = CommentTree::build(ROOT, SortOrder::Hot, &comments, &HashMap::new());
        assert_eq!(dropped, 2);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_details_and_descendants() {
        let tree = sample();
        let details = tree.details();
        assert_eq!(details.cids, ids(&[10, 30, 20, 22, 21, 211]));
        assert_eq!(details.depth[&ItemId(211)], 2);
        assert_eq!(details.parents[&ItemId(21)], Some(ItemId(20)));
        assert_eq!(details.parents[&ItemId(10)], None);

        let counts = tree.descendant_counts();
        assert_eq!(counts[&ItemId(20)], 3);
        assert_eq!(counts[&ItemId(21)], 1);
        assert!(!counts.contains_key(&ItemId(10)));
    }

    #[test]
    fn test_codec() {
        let tree = sample();
        let bytes = tree.encode("tree:1").unwrap();
        assert_eq!(CommentTree::decode("tree:1", &bytes).unwrap(), tree);
        assert!(CommentTree::decode("tree:1", &bytes[..3]).is_err());
    }

    /// Comment `n` replies to an earlier comment or sits at the top level.
    fn forest() -> impl Strategy<Value = Vec<(Option<usize>, i64)>> {
        prop::collection::vec((any::<prop::sample::Index>(), any::<bool>(), -20i64..50), 1..40).prop_map(
            |raw| {
                raw.into_iter()
                    .enumerate()
                    .map(|(n, (pick, top, score))| {
                        let parent = (n > 0 && !top).then(|| pick.index(n));
                        (parent, score)
                    })
                    .collect()
            },
        )
    }

    proptest! {
        #[test]
        fn prop_resort_keeps_sums_consistent(
            shape in forest(),
            bumps in prop::collection::vec((any::<prop::sample::Index>(), -10i64..10), 1..8),
        ) {
            let id = |n: usize| 100 + n as u64;
            let comments: Vec<ItemInfo> = shape
                .iter()
                .enumerate()
                .map(|(n, (parent, _))| comment(id(n), parent.map(id)))
                .collect();
            let mut fresh: HashMap<ItemId, NodeRank> = shape
                .iter()
                .enumerate()
                .map(|(n, (_, score))| (ItemId(id(n)), NodeRank { score: *score, rank: *score as f64 }))
                .collect();

            let (mut tree, dropped) = CommentTree::build(ROOT, SortOrder::Top, &comments, &fresh);
            prop_assert_eq!(dropped, 0);
            prop_assert_eq!(tree.len(), shape.len());
            prop_assert!(tree.sums_consistent());

            let mut affected = BTreeSet::new();
            for (pick, delta) in &bumps {
                let target = ItemId(id(pick.index(shape.len())));
                if let Some(rank) = fresh.get_mut(&target) {
                    rank.score += delta;
                    rank.rank = rank.score as f64;
                }
                affected.insert(target);
            }
            tree.resort(&affected, &fresh).unwrap();

            prop_assert!(tree.sums_consistent());
            prop_assert_eq!(tree.preorder().len(), shape.len());
            for target in &affected {
                prop_assert_eq!(tree.get(*target).unwrap().score, fresh[target].score);
            }
        }
    }
}
