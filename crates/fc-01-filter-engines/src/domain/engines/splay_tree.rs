//! Self-adjusting variant of the weighted tree
//!
//! Same structure and traversal as [`WeightedTree`], but a top-level node
//! that matches is moved to the front of the chain, so recently popular
//! filters are checked first. Subset chains are never reordered.

use super::weighted_tree::{chain, WeightedTree};
use super::{EngineKind, MatchIndex};
use crate::domain::locality::LocalityMap;
use crate::domain::subscription::Subscriptions;
use crate::error::FilterError;
use serde::{Deserialize, Serialize};
use tracing::trace;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SplayTree {
    inner: WeightedTree,
}

impl SplayTree {
    /// Search and move the matching top-level node to the root.
    pub fn search_adaptive(&mut self, id: &[u8]) -> Vec<String> {
        let first_match = chain(self.inner.root.as_deref()).position(|node| node.filter.matches(id));
        let Some(depth) = first_match else {
            return Vec::new();
        };
        if depth > 0 {
            self.splay(depth);
        }
        self.inner.search(id)
    }

    /// Unlink the node at `depth` in the top-level chain and make it the root
    fn splay(&mut self, depth: usize) {
        let mut slot = &mut self.inner.root;
        for _ in 0..depth {
            match slot {
                Some(node) => slot = &mut node.mismatch_branch,
                None => return,
            }
        }
        let Some(mut node) = slot.take() else {
            return;
        };
        *slot = node.mismatch_branch.take();

        trace!(pattern = node.filter.pattern(), depth, "splay to root");
        node.mismatch_branch = self.inner.root.take();
        self.inner.root = Some(node);
    }

    /// Patterns of the top-level chain, in search order
    pub fn chain_patterns(&self) -> Vec<String> {
        self.inner.chain_patterns()
    }
}

impl MatchIndex for SplayTree {
    const KIND: EngineKind = EngineKind::SplayTree;

    fn build(subscriptions: &Subscriptions) -> Self {
        Self {
            inner: WeightedTree::build(subscriptions),
        }
    }

    /// Non-adjusting search
    fn search(&self, id: &[u8]) -> Vec<String> {
        self.inner.search(id)
    }

    fn add(&mut self, pattern: &str, report_uri: &str) {
        self.inner.add(pattern, report_uri);
    }

    fn delete(&mut self, pattern: &str, report_uri: &str) -> Result<(), FilterError> {
        self.inner.delete(pattern, report_uri)
    }

    fn dump(&self) -> String {
        self.inner.dump()
    }

    fn trace(&self, id: &[u8], locality: &mut LocalityMap) {
        self.inner.trace(id, locality);
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splay_tree() -> SplayTree {
        let mut subs = Subscriptions::new();
        subs.insert("1111", "A", 3.0).unwrap();
        subs.insert("0101", "B", 2.0).unwrap();
        subs.insert("0011", "C", 1.0).unwrap();
        subs.insert("00110000", "C2", 1.0).unwrap();
        SplayTree::build(&subs)
    }

    #[test]
    fn test_match_moves_to_root() {
        let mut tree = splay_tree();
        assert_eq!(tree.chain_patterns(), ["1111", "0011", "0101"]);

        assert_eq!(tree.search_adaptive(&[0x50]), ["B"]);
        assert_eq!(tree.chain_patterns(), ["0101", "1111", "0011"]);
        assert!(tree.dump().starts_with("--0101(0 4) -> B\n"));
    }

    #[test]
    fn test_match_at_root_keeps_structure() {
        let mut tree = splay_tree();
        let before = tree.dump();
        assert_eq!(tree.search_adaptive(&[0xF0]), ["A"]);
        assert_eq!(tree.dump(), before);
    }

    #[test]
    fn test_mismatch_keeps_structure() {
        let mut tree = splay_tree();
        let before = tree.dump();
        assert!(tree.search_adaptive(&[0x80]).is_empty());
        assert!(tree.search_adaptive(&[]).is_empty());
        assert_eq!(tree.dump(), before);
    }

    #[test]
    fn test_subset_is_not_splayed() {
        let mut tree = splay_tree();
        assert_eq!(tree.search_adaptive(&[0x30]), ["C", "C2"]);
        assert_eq!(tree.chain_patterns(), ["0011", "1111", "0101"]);
        assert!(tree.dump().starts_with("--0011(0 4) -> C\n  ok--0000(4 4) -> C2\n"));
    }

    #[test]
    fn test_search_does_not_splay() {
        let tree = splay_tree();
        let before = tree.dump();
        assert_eq!(tree.search(&[0x50]), ["B"]);
        assert_eq!(tree.dump(), before);
    }

    #[test]
    fn test_blob_round_trip_keeps_splayed_order() {
        let mut tree = splay_tree();
        tree.search_adaptive(&[0x50]);
        let decoded = SplayTree::from_bytes(&tree.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.chain_patterns(), tree.chain_patterns());
    }
}
