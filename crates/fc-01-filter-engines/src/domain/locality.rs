//! Traffic locality analysis
//!
//! Replays identifiers through an engine without touching its structure and
//! counts how often every node is visited. A visit is keyed by the path of
//! node labels from the entry point, so the same node reached through two
//! different routes is counted separately.
//!
//! ```text
//! Entry (100)
//! └── A (100)
//!     ├── Match (60)
//!     └── B (40)
//!         └── Mismatch (40)
//! ```

use super::engines::FilterEngine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the synthetic root node
pub const ENTRY: &str = "Entry";
/// Terminal marker for a walk that ended on a match
pub const MATCH: &str = "Match";
/// Terminal marker for a walk that ended on a mismatch
pub const MISMATCH: &str = "Mismatch";

/// Visit counts keyed by node path
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocalityMap {
    samples: u64,
    visits: BTreeMap<Vec<String>, u64>,
}

impl LocalityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more identifier entering the engine
    pub fn record_sample(&mut self) {
        self.samples += 1;
    }

    /// Count a visit to the node at the end of `path`
    pub fn record(&mut self, path: &[String]) {
        *self.visits.entry(path.to_vec()).or_default() += 1;
    }

    /// Count the terminal marker below `path`
    pub fn record_terminal(&mut self, path: &[String], matched: bool) {
        let mut terminal = path.to_vec();
        terminal.push(if matched { MATCH } else { MISMATCH }.to_string());
        self.record(&terminal);
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Visit count for a path, zero if never visited
    pub fn visits(&self, path: &[&str]) -> u64 {
        let key: Vec<String> = path.iter().map(|label| label.to_string()).collect();
        self.visits.get(key.as_slice()).copied().unwrap_or(0)
    }

    /// Normalize the counts into a tree of percentages of the sample count
    pub fn report(&self) -> LocalityReport {
        let mut root = LocalityReport::node(ENTRY, None, if self.samples > 0 { 100.0 } else { 0.0 });

        // Key order puts every path before its extensions
        for (path, count) in &self.visits {
            let value = if self.samples > 0 {
                100.0 * *count as f64 / self.samples as f64
            } else {
                0.0
            };
            root.insert(path, value);
        }
        root
    }
}

/// A node of the locality tree
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalityReport {
    pub name: String,
    pub parent: Option<String>,
    /// Percentage of samples that visited this node
    pub value: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LocalityReport>,
}

impl LocalityReport {
    fn node(name: &str, parent: Option<&str>, value: f64) -> Self {
        Self {
            name: name.to_string(),
            parent: parent.map(str::to_string),
            value,
            children: Vec::new(),
        }
    }

    fn insert(&mut self, path: &[String], value: f64) {
        let Some((head, rest)) = path.split_first() else {
            return;
        };

        let position = match self.children.iter().position(|child| &child.name == head) {
            Some(position) => position,
            None => {
                self.children
                    .push(Self::node(head, Some(&self.name), 0.0));
                self.children.len() - 1
            }
        };

        let child = &mut self.children[position];
        if rest.is_empty() {
            child.value = value;
        } else {
            child.insert(rest, value);
        }
    }

    /// Descendant reached by following `path` of names from this node
    pub fn find(&self, path: &[&str]) -> Option<&LocalityReport> {
        match path.split_first() {
            None => Some(self),
            Some((head, rest)) => self
                .children
                .iter()
                .find(|child| child.name == *head)
                .and_then(|child| child.find(rest)),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Replays identifier samples through an engine
pub struct LocalityAnalyzer;

impl LocalityAnalyzer {
    /// Trace every sample through `engine` and report per-node usage.
    ///
    /// Uses the non-adjusting traversal, so a splay tree keeps its shape.
    pub fn analyze<'a, I>(engine: &FilterEngine, samples: I) -> LocalityReport
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        Self::trace(engine, samples).report()
    }

    /// Raw visit counts for every sample
    pub fn trace<'a, I>(engine: &FilterEngine, samples: I) -> LocalityMap
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut locality = LocalityMap::new();
        for id in samples {
            locality.record_sample();
            engine.trace(id, &mut locality);
        }
        locality
    }
}
