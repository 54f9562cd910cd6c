//! Binary radix tree (Patricia trie) engine
//!
//! Each edge holds the longest common prefix of the patterns below it. After
//! an edge matches, the next identifier bit picks the `one` or `zero` child,
//! so a search touches at most one node per branching bit.
//!
//! ```text
//!   --0011(0 4) -> A
//!     --0000(4 4) -> A2
//! ```
//!
//! INVARIANT: every node without a URI has two children (the tree is kept
//! canonical), so building from a set and reaching the same set through
//! `add`/`delete` give identical dumps.

use super::{EngineKind, MatchIndex};
use crate::domain::bit_filter::{bit_at, common_prefix, longest_common_prefix, BitFilter};
use crate::domain::locality::LocalityMap;
use crate::domain::subscription::Subscriptions;
use crate::error::FilterError;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct TrieNode {
    report_uri: Option<String>,
    filter: BitFilter,
    one: Option<Box<TrieNode>>,
    zero: Option<Box<TrieNode>>,
}

impl TrieNode {
    fn leaf(pattern: &str, offset: usize, report_uri: &str) -> Box<Self> {
        Box::new(Self {
            report_uri: Some(report_uri.to_string()),
            filter: BitFilter::new(&pattern[offset..], offset),
            one: None,
            zero: None,
        })
    }

    fn child(&self, bit: bool) -> Option<&TrieNode> {
        if bit { self.one.as_deref() } else { self.zero.as_deref() }
    }

    fn child_mut(&mut self, bit: char) -> &mut Option<Box<TrieNode>> {
        if bit == '1' { &mut self.one } else { &mut self.zero }
    }

    fn label(&self) -> String {
        match &self.report_uri {
            Some(uri) => uri.clone(),
            None => self.filter.to_string(),
        }
    }

    fn count(&self) -> usize {
        usize::from(self.report_uri.is_some())
            + self.one.as_ref().map_or(0, |n| n.count())
            + self.zero.as_ref().map_or(0, |n| n.count())
    }

    fn print(&self, out: &mut String, indent: usize) {
        let _ = write!(out, "{:indent$}--{}", "", self.filter);
        if let Some(uri) = &self.report_uri {
            let _ = write!(out, " -> {uri}");
        }
        out.push('\n');
        for child in [&self.one, &self.zero].into_iter().flatten() {
            child.print(out, indent + 2);
        }
    }
}

/// Patricia trie over subscription patterns
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PatriciaTrie {
    root: Option<Box<TrieNode>>,
}

/// Build the subtree for `entries`, which all share their first `offset` bits
fn grow(entries: &[(&str, &str)], offset: usize) -> Box<TrieNode> {
    let edge = longest_common_prefix(entries.iter().map(|(pattern, _)| &pattern[offset..]));
    let full = offset + edge.len();

    let report_uri = entries
        .iter()
        .find(|(pattern, _)| pattern.len() == full)
        .map(|(_, uri)| uri.to_string());
    let (ones, zeros): (Vec<_>, Vec<_>) = entries
        .iter()
        .filter(|(pattern, _)| pattern.len() > full)
        .copied()
        .partition(|(pattern, _)| pattern.as_bytes()[full] == b'1');

    Box::new(TrieNode {
        report_uri,
        filter: BitFilter::new(edge, offset),
        one: (!ones.is_empty()).then(|| grow(&ones, full)),
        zero: (!zeros.is_empty()).then(|| grow(&zeros, full)),
    })
}

/// Insert `pattern` below a node starting at bit `offset`
fn insert(slot: Option<Box<TrieNode>>, pattern: &str, offset: usize, report_uri: &str) -> Box<TrieNode> {
    let Some(mut node) = slot else {
        return TrieNode::leaf(pattern, offset, report_uri);
    };

    let edge = node.filter.pattern().to_string();
    let rest = &pattern[offset..];
    let common = common_prefix(&edge, rest).len();
    let full = offset + common;

    if common == edge.len() {
        if common == rest.len() {
            node.report_uri = Some(report_uri.to_string());
        } else {
            let bit = rest[common..].chars().next().unwrap_or('0');
            let branch = node.child_mut(bit);
            *branch = Some(insert(branch.take(), pattern, full, report_uri));
        }
        return node;
    }

    // Split the edge where the new pattern leaves it
    let lower = Box::new(TrieNode {
        report_uri: node.report_uri.take(),
        filter: BitFilter::new(&edge[common..], full),
        one: node.one.take(),
        zero: node.zero.take(),
    });
    let mut upper = Box::new(TrieNode {
        report_uri: None,
        filter: BitFilter::new(&edge[..common], offset),
        one: None,
        zero: None,
    });
    let lower_bit = edge[common..].chars().next().unwrap_or('0');
    *upper.child_mut(lower_bit) = Some(lower);

    if common == rest.len() {
        upper.report_uri = Some(report_uri.to_string());
    } else {
        let bit = rest[common..].chars().next().unwrap_or('0');
        *upper.child_mut(bit) = Some(TrieNode::leaf(pattern, full, report_uri));
    }
    upper
}

/// Clear the URI of `pattern` if it equals `report_uri`, compacting on the
/// way back up. Returns whether anything was removed.
fn remove(slot: &mut Option<Box<TrieNode>>, pattern: &str, report_uri: &str) -> bool {
    let Some(node) = slot.as_mut() else {
        return false;
    };
    let Some(rest) = pattern.get(node.filter.offset()..) else {
        return false;
    };
    if !rest.starts_with(node.filter.pattern()) {
        return false;
    }

    let removed = if rest.len() == node.filter.size() {
        if node.report_uri.as_deref() == Some(report_uri) {
            node.report_uri = None;
            true
        } else {
            false
        }
    } else {
        let bit = rest[node.filter.size()..].chars().next().unwrap_or('0');
        remove(node.child_mut(bit), pattern, report_uri)
    };

    if removed {
        compact(slot);
    }
    removed
}

/// Drop a URI-less leaf, or merge a URI-less node into its only child
fn compact(slot: &mut Option<Box<TrieNode>>) {
    let Some(node) = slot.take() else {
        return;
    };
    if node.report_uri.is_some() {
        *slot = Some(node);
        return;
    }

    let TrieNode { filter, one, zero, .. } = *node;
    *slot = match (one, zero) {
        (None, None) => None,
        (Some(mut child), None) | (None, Some(mut child)) => {
            child.filter = BitFilter::new(
                format!("{}{}", filter.pattern(), child.filter.pattern()),
                filter.offset(),
            );
            Some(child)
        }
        (one, zero) => Some(Box::new(TrieNode {
            report_uri: None,
            filter,
            one,
            zero,
        })),
    };
}

impl MatchIndex for PatriciaTrie {
    const KIND: EngineKind = EngineKind::PatriciaTrie;

    fn build(subscriptions: &Subscriptions) -> Self {
        let entries: Vec<(&str, &str)> = subscriptions
            .iter()
            .map(|(pattern, sub)| (pattern, sub.report_uri.as_str()))
            .collect();
        let root = (!entries.is_empty()).then(|| grow(&entries, 0));
        Self { root }
    }

    fn search(&self, id: &[u8]) -> Vec<String> {
        let mut matches = Vec::new();
        let mut next = self.root.as_deref();

        while let Some(node) = next {
            if !node.filter.matches(id) {
                break;
            }
            if let Some(uri) = &node.report_uri {
                matches.push(uri.clone());
            }
            // Running out of bits ends the walk, it is not a mismatch
            next = bit_at(id, node.filter.end_offset()).and_then(|bit| node.child(bit));
        }
        matches
    }

    fn add(&mut self, pattern: &str, report_uri: &str) {
        self.root = Some(insert(self.root.take(), pattern, 0, report_uri));
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
        let mut matched = false;
        let mut next = self.root.as_deref();

        while let Some(node) = next {
            path.push(node.label());
            locality.record(&path);
            if !node.filter.matches(id) {
                break;
            }
            matched |= node.report_uri.is_some();
            next = bit_at(id, node.filter.end_offset()).and_then(|bit| node.child(bit));
        }
        locality.record_terminal(&path, matched);
    }

    fn len(&self) -> usize {
        self.root.as_ref().map_or(0, |root| root.count())
    }
}
