//! Coordinator configuration and validation
//!
//! # Example
//!
//! ```ignore
//! use fc_01_filter_engines::domain::{CoordinatorConfigBuilder, EngineKind};
//!
//! let config = CoordinatorConfigBuilder::new()
//!     .engines([EngineKind::List, EngineKind::PatriciaTrie])
//!     .priority(EngineKind::List, 9)
//!     .shadow_search(true)
//!     .build()
//!     .expect("Valid config");
//! ```

use super::engines::EngineKind;
use crate::error::FilterError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Bus capacity used when none is configured
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Which engines to build and how to choose between them
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Engine variants to build, in start order
    pub engines: Vec<EngineKind>,
    /// Deployment priority; a finished engine replaces the current one
    /// only if its priority is strictly higher
    pub priorities: BTreeMap<EngineKind, u8>,
    /// Interval between traffic statistics reports (seconds)
    pub stat_interval_secs: u64,
    /// Also run searches through ready engines that are not deployed
    pub shadow_search: bool,
    /// Management bus capacity
    pub channel_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            engines: EngineKind::ALL.to_vec(),
            priorities: default_priorities(),
            stat_interval_secs: 5,
            shadow_search: false,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

fn default_priorities() -> BTreeMap<EngineKind, u8> {
    BTreeMap::from([
        (EngineKind::List, 1),
        (EngineKind::WeightedTree, 2),
        (EngineKind::SplayTree, 3),
        (EngineKind::PatriciaTrie, 4),
    ])
}

impl CoordinatorConfig {
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.engines.is_empty() {
            return Err(FilterError::InvalidConfig(
                "at least one engine must be enabled".to_string(),
            ));
        }

        let mut seen = Vec::with_capacity(self.engines.len());
        for kind in &self.engines {
            if seen.contains(kind) {
                return Err(FilterError::InvalidConfig(format!(
                    "engine {kind} enabled twice"
                )));
            }
            seen.push(*kind);
        }

        if self.stat_interval_secs == 0 {
            return Err(FilterError::InvalidConfig(
                "stat_interval_secs cannot be 0".to_string(),
            ));
        }

        if self.channel_capacity == 0 {
            return Err(FilterError::InvalidConfig(
                "channel_capacity cannot be 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Priority of `kind`, zero if unlisted
    pub fn priority(&self, kind: EngineKind) -> u8 {
        self.priorities.get(&kind).copied().unwrap_or(0)
    }

    pub fn stat_interval(&self) -> Duration {
        Duration::from_secs(self.stat_interval_secs)
    }

    pub fn with_engines(mut self, engines: impl IntoIterator<Item = EngineKind>) -> Self {
        self.engines = engines.into_iter().collect();
        self
    }

    pub fn with_priority(mut self, kind: EngineKind, priority: u8) -> Self {
        self.priorities.insert(kind, priority);
        self
    }

    pub fn with_shadow_search(mut self, enabled: bool) -> Self {
        self.shadow_search = enabled;
        self
    }
}

/// Builder for [`CoordinatorConfig`] with validation
#[derive(Default)]
pub struct CoordinatorConfigBuilder {
    engines: Option<Vec<EngineKind>>,
    priorities: BTreeMap<EngineKind, u8>,
    stat_interval_secs: Option<u64>,
    shadow_search: Option<bool>,
    channel_capacity: Option<usize>,
}

impl CoordinatorConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn engines(mut self, engines: impl IntoIterator<Item = EngineKind>) -> Self {
        self.engines = Some(engines.into_iter().collect());
        self
    }

    /// Override the priority of one engine; others keep their defaults
    pub fn priority(mut self, kind: EngineKind, priority: u8) -> Self {
        self.priorities.insert(kind, priority);
        self
    }

    pub fn stat_interval_secs(mut self, secs: u64) -> Self {
        self.stat_interval_secs = Some(secs);
        self
    }

    pub fn shadow_search(mut self, enabled: bool) -> Self {
        self.shadow_search = Some(enabled);
        self
    }

    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = Some(capacity);
        self
    }

    pub fn build(self) -> Result<CoordinatorConfig, FilterError> {
        let config = self.build_unchecked();
        config.validate()?;
        Ok(config)
    }

    /// Build without validation (for tests)
    pub fn build_unchecked(self) -> CoordinatorConfig {
        let defaults = CoordinatorConfig::default();
        let mut priorities = defaults.priorities;
        priorities.extend(self.priorities);

        CoordinatorConfig {
            engines: self.engines.unwrap_or(defaults.engines),
            priorities,
            stat_interval_secs: self.stat_interval_secs.unwrap_or(defaults.stat_interval_secs),
            shadow_search: self.shadow_search.unwrap_or(defaults.shadow_search),
            channel_capacity: self.channel_capacity.unwrap_or(defaults.channel_capacity),
        }
    }
}
