//! Matching engines
//!
//! Four interchangeable index structures built from the same
//! [`Subscriptions`]. For any identifier they report the same set of URIs;
//! they differ in layout, search cost and how they react to traffic.
//!
//! | Engine | Layout | Search |
//! |--------|--------|--------|
//! | [`ListIndex`] | sorted filters | linear scan |
//! | [`PatriciaTrie`] | binary radix tree | follow id bits |
//! | [`WeightedTree`] | weight-ordered chain with subset branches | stop at first chain match |
//! | [`SplayTree`] | weighted tree, matched node moved to root | as weighted tree |
//!
//! Engines serialize to a blob that starts with the tag `Engine:<name>`.

pub mod list;
pub mod patricia_trie;
pub mod splay_tree;
pub mod weighted_tree;

pub use list::ListIndex;
pub use patricia_trie::PatriciaTrie;
pub use splay_tree::SplayTree;
pub use weighted_tree::WeightedTree;

use super::locality::LocalityMap;
use super::subscription::Subscriptions;
use crate::error::FilterError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The registered engine variants
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EngineKind {
    List,
    PatriciaTrie,
    WeightedTree,
    SplayTree,
}

impl EngineKind {
    pub const ALL: [EngineKind; 4] = [
        EngineKind::List,
        EngineKind::PatriciaTrie,
        EngineKind::WeightedTree,
        EngineKind::SplayTree,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::List => "List",
            Self::PatriciaTrie => "PatriciaTrie",
            Self::WeightedTree => "WeightedTree",
            Self::SplayTree => "SplayTree",
        }
    }

    /// Tag written at the start of a serialized engine
    pub fn type_tag(self) -> String {
        format!("Engine:{}", self.name())
    }

    /// Engines whose structure changes while searching
    pub fn is_self_adjusting(self) -> bool {
        matches!(self, Self::SplayTree)
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EngineKind {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| FilterError::InvalidConfig(format!("unknown engine {s:?}")))
    }
}

/// Operations every engine variant provides
pub trait MatchIndex: Serialize + DeserializeOwned + Sized {
    const KIND: EngineKind;

    /// Build from a snapshot of subscriptions
    fn build(subscriptions: &Subscriptions) -> Self;

    /// URIs of every subscription whose pattern matches `id`
    fn search(&self, id: &[u8]) -> Vec<String>;

    /// Add a subscription, or replace the URI of an existing pattern
    fn add(&mut self, pattern: &str, report_uri: &str);

    /// Remove the subscription `pattern -> report_uri`
    fn delete(&mut self, pattern: &str, report_uri: &str) -> Result<(), FilterError>;

    /// Indented rendering of the structure
    fn dump(&self) -> String;

    /// Walk `id` through the structure the way `search` does, recording
    /// every visited node. Never changes the structure.
    fn trace(&self, id: &[u8], locality: &mut LocalityMap);

    /// Number of subscriptions held
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn to_bytes(&self) -> Result<Vec<u8>, FilterError> {
        let mut bytes = bincode::serialize(&Self::KIND.type_tag())?;
        bincode::serialize_into(&mut bytes, self)?;
        Ok(bytes)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, FilterError> {
        let (tag, body) = split_tag(bytes)?;
        let expected = Self::KIND.type_tag();
        if tag != expected {
            return Err(FilterError::TypeMismatch {
                expected,
                found: tag,
            });
        }
        Ok(bincode::deserialize(body)?)
    }
}

/// Read the type tag and return it with the remaining body
fn split_tag(bytes: &[u8]) -> Result<(String, &[u8]), FilterError> {
    let tag: String = bincode::deserialize(bytes)?;
    let consumed = bincode::serialized_size(&tag)? as usize;
    let body = bytes
        .get(consumed..)
        .ok_or_else(|| FilterError::Serialization("truncated engine blob".to_string()))?;
    Ok((tag, body))
}

/// A built engine of any variant
#[derive(Clone, Debug)]
pub enum FilterEngine {
    List(ListIndex),
    PatriciaTrie(PatriciaTrie),
    WeightedTree(WeightedTree),
    SplayTree(SplayTree),
}

macro_rules! dispatch {
    ($engine:expr, $inner:ident => $body:expr) => {
        match $engine {
            FilterEngine::List($inner) => $body,
            FilterEngine::PatriciaTrie($inner) => $body,
            FilterEngine::WeightedTree($inner) => $body,
            FilterEngine::SplayTree($inner) => $body,
        }
    };
}

impl FilterEngine {
    pub fn build(kind: EngineKind, subscriptions: &Subscriptions) -> Self {
        match kind {
            EngineKind::List => Self::List(ListIndex::build(subscriptions)),
            EngineKind::PatriciaTrie => Self::PatriciaTrie(PatriciaTrie::build(subscriptions)),
            EngineKind::WeightedTree => Self::WeightedTree(WeightedTree::build(subscriptions)),
            EngineKind::SplayTree => Self::SplayTree(SplayTree::build(subscriptions)),
        }
    }

    pub fn kind(&self) -> EngineKind {
        match self {
            Self::List(_) => EngineKind::List,
            Self::PatriciaTrie(_) => EngineKind::PatriciaTrie,
            Self::WeightedTree(_) => EngineKind::WeightedTree,
            Self::SplayTree(_) => EngineKind::SplayTree,
        }
    }

    /// Search without changing the structure
    pub fn search(&self, id: &[u8]) -> Vec<String> {
        dispatch!(self, engine => engine.search(id))
    }

    /// Search, letting self-adjusting engines reorganize
    pub fn search_adaptive(&mut self, id: &[u8]) -> Vec<String> {
        match self {
            Self::SplayTree(engine) => engine.search_adaptive(id),
            other => other.search(id),
        }
    }

    pub fn add(&mut self, pattern: &str, report_uri: &str) {
        dispatch!(self, engine => engine.add(pattern, report_uri))
    }

    pub fn delete(&mut self, pattern: &str, report_uri: &str) -> Result<(), FilterError> {
        dispatch!(self, engine => engine.delete(pattern, report_uri))
    }

    pub fn dump(&self) -> String {
        dispatch!(self, engine => engine.dump())
    }

    pub fn trace(&self, id: &[u8], locality: &mut LocalityMap) {
        dispatch!(self, engine => engine.trace(id, locality))
    }

    pub fn len(&self) -> usize {
        dispatch!(self, engine => engine.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, FilterError> {
        dispatch!(self, engine => engine.to_bytes())
    }

    /// Decode a blob of any variant, selected by its tag
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FilterError> {
        let (tag, _) = split_tag(bytes)?;
        let kind = EngineKind::ALL
            .into_iter()
            .find(|kind| kind.type_tag() == tag)
            .ok_or_else(|| FilterError::TypeMismatch {
                expected: "Engine:<List|PatriciaTrie|WeightedTree|SplayTree>".to_string(),
                found: tag,
            })?;

        Ok(match kind {
            EngineKind::List => Self::List(ListIndex::from_bytes(bytes)?),
            EngineKind::PatriciaTrie => Self::PatriciaTrie(PatriciaTrie::from_bytes(bytes)?),
            EngineKind::WeightedTree => Self::WeightedTree(WeightedTree::from_bytes(bytes)?),
            EngineKind::SplayTree => Self::SplayTree(SplayTree::from_bytes(bytes)?),
        })
    }
}
