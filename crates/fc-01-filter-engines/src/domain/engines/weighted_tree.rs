//! Weight-ordered binary tree engine
//!
//! Top-level subscriptions form a chain linked through `mismatch_branch`,
//! heaviest first, so the filters that see the most traffic are checked
//! first. A subscription whose pattern extends another one lives in that
//! node's `match_branch`, holding only the remaining bits.
//!
//! ```text
//!   --0011(0 4) -> A
//!     ok--0000(4 4) -> A2
//!     ng--1111(0 4) -> B
//! ```
//!
//! INVARIANTS:
//! - No two nodes of the same chain have prefix-related patterns, so at most
//!   one of them matches an identifier and the walk stops at that match.
//! - A chain is ordered by descending aggregated weight, ties by pattern.
//!   `add` and `delete` place nodes by the same key, so adding and then
//!   deleting a subscription restores the previous dump.

use super::{EngineKind, MatchIndex};
use crate::domain::bit_filter::BitFilter;
use crate::domain::locality::LocalityMap;
use crate::domain::subscription::Subscriptions;
use crate::error::FilterError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::Write;
use std::iter::successors;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(super) struct TreeNode {
    pub(super) report_uri: String,
    pub(super) filter: BitFilter,
    /// Own weight; the subset's weight is added when ordering
    pub(super) weight: f64,
    pub(super) match_branch: Option<Box<TreeNode>>,
    pub(super) mismatch_branch: Option<Box<TreeNode>>,
}

impl TreeNode {
    fn aggregated_weight(&self) -> f64 {
        self.weight
            + chain(self.match_branch.as_deref())
                .map(TreeNode::aggregated_weight)
                .sum::<f64>()
    }

    /// Chain order: heavier first, then by pattern
    fn order(&self, other: &TreeNode) -> Ordering {
        other
            .aggregated_weight()
            .total_cmp(&self.aggregated_weight())
            .then_with(|| self.filter.pattern().cmp(other.filter.pattern()))
    }

    fn print(&self, out: &mut String, indent: usize) {
        let _ = writeln!(out, "--{} -> {}", self.filter, self.report_uri);
        if let Some(child) = &self.match_branch {
            let _ = write!(out, "{:width$}ok", "", width = indent + 2);
            child.print(out, indent + 2);
        }
        if let Some(sibling) = &self.mismatch_branch {
            let _ = write!(out, "{:width$}ng", "", width = indent + 2);
            sibling.print(out, indent + 2);
        }
    }
}

/// Nodes of the chain starting at `head`
pub(super) fn chain(head: Option<&TreeNode>) -> impl Iterator<Item = &TreeNode> {
    successors(head, |node| node.mismatch_branch.as_deref())
}

/// Break a chain into its nodes, mismatch links cleared
pub(super) fn unlink(mut head: Option<Box<TreeNode>>) -> Vec<Box<TreeNode>> {
    let mut nodes = Vec::new();
    while let Some(mut node) = head {
        head = node.mismatch_branch.take();
        nodes.push(node);
    }
    nodes
}

/// Link nodes into a chain in the given order
pub(super) fn relink(nodes: Vec<Box<TreeNode>>) -> Option<Box<TreeNode>> {
    nodes.into_iter().rev().fold(None, |next, mut node| {
        node.mismatch_branch = next;
        Some(node)
    })
}

/// Insert `node` before the first node that orders after it
fn place(nodes: &mut Vec<Box<TreeNode>>, node: Box<TreeNode>) {
    let at = nodes
        .iter()
        .position(|other| node.order(other) == Ordering::Less)
        .unwrap_or(nodes.len());
    nodes.insert(at, node);
}

/// Move a node one level down below a parent holding the first `len` bits
fn demote(mut node: Box<TreeNode>, len: usize) -> Box<TreeNode> {
    let pattern = &node.filter.pattern()[len..];
    node.filter = BitFilter::new(pattern, node.filter.offset() + len);
    node
}

/// Move a subset node up into its parent's place
fn promote(parent: &BitFilter, mut node: Box<TreeNode>) -> Box<TreeNode> {
    node.filter = BitFilter::new(
        format!("{}{}", parent.pattern(), node.filter.pattern()),
        parent.offset(),
    );
    node
}

fn grow(subscriptions: &Subscriptions) -> Option<Box<TreeNode>> {
    let mut head = None;
    for (pattern, sub) in subscriptions.by_weight().into_iter().rev() {
        head = Some(Box::new(TreeNode {
            report_uri: sub.report_uri.clone(),
            filter: BitFilter::new(pattern, sub.offset),
            weight: sub.weight,
            match_branch: grow(&sub.subset),
            mismatch_branch: head,
        }));
    }
    head
}

/// Insert the remaining bits `pattern` into the chain at `slot`, which
/// starts at bit `offset`
fn insert(slot: &mut Option<Box<TreeNode>>, pattern: &str, offset: usize, report_uri: &str) {
    let mut nodes = unlink(slot.take());

    match nodes
        .iter()
        .position(|node| pattern.starts_with(node.filter.pattern()))
    {
        Some(i) => {
            let node = &mut nodes[i];
            let len = node.filter.size();
            if len == pattern.len() {
                node.report_uri = report_uri.to_string();
            } else {
                insert(&mut node.match_branch, &pattern[len..], offset + len, report_uri);
            }
        }
        None => {
            let (extended, rest): (Vec<_>, Vec<_>) = nodes
                .into_iter()
                .partition(|node| node.filter.pattern().starts_with(pattern));
            nodes = rest;

            let children = extended
                .into_iter()
                .map(|node| demote(node, pattern.len()))
                .collect();
            let node = Box::new(TreeNode {
                report_uri: report_uri.to_string(),
                filter: BitFilter::new(pattern, offset),
                weight: 0.0,
                match_branch: relink(children),
                mismatch_branch: None,
            });
            place(&mut nodes, node);
        }
    }

    *slot = relink(nodes);
}

/// Remove `pattern -> report_uri` from the chain at `slot`; the removed
/// node's subset takes its place. Returns whether anything was removed.
fn remove(slot: &mut Option<Box<TreeNode>>, pattern: &str, report_uri: &str) -> bool {
    let mut nodes = unlink(slot.take());

    let removed = match nodes
        .iter()
        .position(|node| pattern.starts_with(node.filter.pattern()))
    {
        Some(i) if nodes[i].filter.size() < pattern.len() => {
            let len = nodes[i].filter.size();
            remove(&mut nodes[i].match_branch, &pattern[len..], report_uri)
        }
        Some(i) if nodes[i].report_uri == report_uri => {
            let TreeNode {
                filter,
                match_branch,
                ..
            } = *nodes.remove(i);
            for child in unlink(match_branch) {
                place(&mut nodes, promote(&filter, child));
            }
            true
        }
        _ => false,
    };

    *slot = relink(nodes);
    removed
}

/// Subscriptions in a weight-ordered tree
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedTree {
    pub(super) root: Option<Box<TreeNode>>,
}

impl WeightedTree {
    /// Patterns of the top-level chain, in search order
    pub fn chain_patterns(&self) -> Vec<String> {
        chain(self.root.as_deref())
            .map(|node| node.filter.pattern().to_string())
            .collect()
    }
}

impl MatchIndex for WeightedTree {
    const KIND: EngineKind = EngineKind::WeightedTree;

    fn build(subscriptions: &Subscriptions) -> Self {
        Self {
            root: grow(&subscriptions.linked()),
        }
    }

    fn search(&self, id: &[u8]) -> Vec<String> {
        let mut matches = Vec::new();
        let mut next = self.root.as_deref();

        while let Some(node) = next {
            next = if node.filter.matches(id) {
                matches.push(node.report_uri.clone());
                node.match_branch.as_deref()
            } else {
                node.mismatch_branch.as_deref()
            };
        }
        matches
    }

    fn add(&mut self, pattern: &str, report_uri: &str) {
        insert(&mut self.root, pattern, 0, report_uri);
    }

    fn delete(&mut self, pattern: &str, report_uri: &str) -> Result<(), FilterError> {
        if remove(&mut self.root, pattern, report_uri) {
            Ok(())
        } else {
            Err(FilterError::NotFound {
                pattern: pattern.to_string(),
                report_uri: report_uri.to_string(),
            })
        }
    }

    fn dump(&self) -> String {
        let mut out = String::new();
        if let Some(root) = &self.root {
            root.print(&mut out, 0);
        }
        out
    }

    fn trace(&self, id: &[u8], locality: &mut LocalityMap) {
        let mut path = Vec::new();
        let Some(root) = self.root.as_deref() else {
            locality.record_terminal(&path, false);
            return;
        };
        let mut next = Some(root);

        // The terminal marks how the last visited node compared
        while let Some(node) = next {
            path.push(node.report_uri.clone());
            locality.record(&path);
            let (matched, branch) = if node.filter.matches(id) {
                (true, node.match_branch.as_deref())
            } else {
                (false, node.mismatch_branch.as_deref())
            };
            if branch.is_none() {
                locality.record_terminal(&path, matched);
            }
            next = branch;
        }
    }

    fn len(&self) -> usize {
        fn count(head: Option<&TreeNode>) -> usize {
            chain(head)
                .map(|node| 1 + count(node.match_branch.as_deref()))
                .sum()
        }
        count(self.root.as_deref())
    }
}
