//! Subscriptions: bit patterns mapped to report destinations
//!
//! Patterns are kept in lexicographic order. Top-level patterns are over
//! `{0, 1}` and start at bit 0; nested subsets carry the suffix of a longer
//! pattern and the bit offset where that suffix begins.

use super::bit_filter::validate_pattern;
use crate::error::FilterError;
use std::collections::BTreeMap;

/// Where matches for a pattern are reported, and how much traffic it is
/// expected to see
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Subscription {
    pub report_uri: String,
    pub weight: f64,
    /// Bit offset of the pattern (non-zero only inside a subset)
    pub offset: usize,
    /// Subscriptions whose patterns extend this one, keyed by suffix
    pub subset: Subscriptions,
}

impl Subscription {
    pub fn new(report_uri: impl Into<String>, weight: f64) -> Self {
        Self {
            report_uri: report_uri.into(),
            weight,
            ..Default::default()
        }
    }

    /// Own weight plus the aggregated weight of every subset entry
    pub fn aggregated_weight(&self) -> f64 {
        self.weight
            + self
                .subset
                .iter()
                .map(|(_, sub)| sub.aggregated_weight())
                .sum::<f64>()
    }
}

/// Ordered map of pattern to [`Subscription`]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Subscriptions(BTreeMap<String, Subscription>);

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a top-level subscription, returning the one it replaces.
    ///
    /// Rejects empty patterns and patterns containing anything but `0`
    /// and `1`. An empty pattern would sit beside every other top-level
    /// pattern while being a prefix of all of them.
    pub fn insert(
        &mut self,
        pattern: &str,
        report_uri: impl Into<String>,
        weight: f64,
    ) -> Result<Option<Subscription>, FilterError> {
        if pattern.is_empty() {
            return Err(FilterError::EmptyPattern);
        }
        validate_pattern(pattern, false)?;
        Ok(self
            .0
            .insert(pattern.to_string(), Subscription::new(report_uri, weight)))
    }

    pub fn remove(&mut self, pattern: &str) -> Option<Subscription> {
        self.0.remove(pattern)
    }

    pub fn get(&self, pattern: &str) -> Option<&Subscription> {
        self.0.get(pattern)
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.0.contains_key(pattern)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in lexicographic pattern order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Subscription)> {
        self.0.iter().map(|(pattern, sub)| (pattern.as_str(), sub))
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Entries ordered by descending aggregated weight.
    ///
    /// Ties keep pattern order; callers must not rely on it.
    pub fn by_weight(&self) -> Vec<(&str, &Subscription)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|(_, a), (_, b)| b.aggregated_weight().total_cmp(&a.aggregated_weight()));
        entries
    }

    /// Nest every pattern that extends another pattern of the same level.
    ///
    /// `"0011"` and `"00110000"` become `"0011"` with subset `{"0000"}` at
    /// offset 4. The result has no two sibling patterns where one is a
    /// prefix of the other.
    pub fn linked(&self) -> Subscriptions {
        let mut roots: BTreeMap<String, Subscription> = BTreeMap::new();
        let mut children: BTreeMap<String, BTreeMap<String, Subscription>> = BTreeMap::new();

        // Lexicographic order visits every prefix before its extensions
        for (pattern, sub) in &self.0 {
            let parent = (1..pattern.len())
                .map(|len| &pattern[..len])
                .find(|prefix| roots.contains_key(*prefix));

            match parent.and_then(|prefix| roots.get(prefix).map(|root| (prefix, root.offset))) {
                Some((prefix, root_offset)) => {
                    let mut child = sub.clone();
                    child.offset = root_offset + prefix.len();
                    children
                        .entry(prefix.to_string())
                        .or_default()
                        .insert(pattern[prefix.len()..].to_string(), child);
                }
                None => {
                    roots.insert(pattern.clone(), sub.clone());
                }
            }
        }

        for (pattern, root) in roots.iter_mut() {
            if let Some(extra) = children.remove(pattern) {
                for (suffix, child) in extra {
                    root.subset.0.entry(suffix).or_insert(child);
                }
            }
            root.subset = root.subset.linked();
        }

        Subscriptions(roots)
    }
}

impl FromIterator<(String, Subscription)> for Subscriptions {
    fn from_iter<T: IntoIterator<Item = (String, Subscription)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
