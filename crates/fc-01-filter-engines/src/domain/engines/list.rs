//! Linear list engine
//!
//! Filters sorted by pattern, every one checked against every identifier.
//! The baseline the tree engines are measured against.

use super::{EngineKind, MatchIndex};
use crate::domain::bit_filter::BitFilter;
use crate::domain::locality::LocalityMap;
use crate::domain::subscription::Subscriptions;
use crate::error::FilterError;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct ListEntry {
    report_uri: String,
    filter: BitFilter,
}

/// Sorted `(uri, filter)` pairs
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ListIndex {
    entries: Vec<ListEntry>,
}

impl ListIndex {
    fn position(&self, pattern: &str) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|entry| entry.filter.pattern().cmp(pattern))
    }
}

impl MatchIndex for ListIndex {
    const KIND: EngineKind = EngineKind::List;

    fn build(subscriptions: &Subscriptions) -> Self {
        let entries = subscriptions
            .iter()
            .map(|(pattern, sub)| ListEntry {
                report_uri: sub.report_uri.clone(),
                filter: BitFilter::new(pattern, 0),
            })
            .collect();
        Self { entries }
    }

    fn search(&self, id: &[u8]) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| entry.filter.matches(id))
            .map(|entry| entry.report_uri.clone())
            .collect()
    }

    fn add(&mut self, pattern: &str, report_uri: &str) {
        match self.position(pattern) {
            Ok(i) => self.entries[i].report_uri = report_uri.to_string(),
            Err(i) => self.entries.insert(
                i,
                ListEntry {
                    report_uri: report_uri.to_string(),
                    filter: BitFilter::new(pattern, 0),
                },
            ),
        }
    }

    fn delete(&mut self, pattern: &str, report_uri: &str) -> Result<(), FilterError> {
        match self.position(pattern) {
            Ok(i) if self.entries[i].report_uri == report_uri => {
                self.entries.remove(i);
                Ok(())
            }
            _ => Err(FilterError::NotFound {
                pattern: pattern.to_string(),
                report_uri: report_uri.to_string(),
            }),
        }
    }

    fn dump(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let _ = writeln!(out, "{} -> {}", entry.filter, entry.report_uri);
        }
        out
    }

    fn trace(&self, id: &[u8], locality: &mut LocalityMap) {
        let mut path = Vec::with_capacity(self.entries.len());
        let mut matched = false;
        for entry in &self.entries {
            path.push(entry.report_uri.clone());
            locality.record(&path);
            matched |= entry.filter.matches(id);
        }
        locality.record_terminal(&path, matched);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
