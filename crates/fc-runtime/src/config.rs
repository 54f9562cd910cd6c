//! Runtime configuration from environment variables.

use anyhow::{Context, Result};
use fc_01_filter_engines::{CoordinatorConfig, CoordinatorConfigBuilder, EngineKind};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Everything the runtime needs to start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// CSV file with `report_uri,pattern[,weight]` records
    pub subscriptions: PathBuf,
    /// File with one hex-encoded identifier per line to replay
    pub traffic: Option<PathBuf>,
    /// Where to write the locality report of the replayed traffic
    pub locality_out: Option<PathBuf>,
    /// Engine variants to build
    pub engines: Vec<EngineKind>,
    pub stat_interval_secs: u64,
    pub shadow_search: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            subscriptions: PathBuf::from("subscriptions.csv"),
            traffic: None,
            locality_out: None,
            engines: EngineKind::ALL.to_vec(),
            stat_interval_secs: 5,
            shadow_search: false,
        }
    }
}

impl RuntimeConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `FC_SUBSCRIPTIONS`: Subscription CSV (default: subscriptions.csv)
    /// - `FC_TRAFFIC`: Hex identifier file to replay (default: none)
    /// - `FC_LOCALITY_OUT`: Locality report output (default: none)
    /// - `FC_ENGINES`: Comma-separated engine names (default: all)
    /// - `FC_STAT_INTERVAL_SECS`: Statistics interval (default: 5)
    /// - `FC_SHADOW_SEARCH`: Search every ready engine (default: false)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = lookup("FC_SUBSCRIPTIONS") {
            config.subscriptions = PathBuf::from(path);
        }
        config.traffic = lookup("FC_TRAFFIC").map(PathBuf::from);
        config.locality_out = lookup("FC_LOCALITY_OUT").map(PathBuf::from);

        if let Some(engines) = lookup("FC_ENGINES") {
            config.engines = engines
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::parse)
                .collect::<Result<_, _>>()
                .context("FC_ENGINES")?;
        }
        if let Some(secs) = lookup("FC_STAT_INTERVAL_SECS") {
            config.stat_interval_secs = secs
                .parse()
                .with_context(|| format!("FC_STAT_INTERVAL_SECS={secs:?}"))?;
        }
        if let Some(flag) = lookup("FC_SHADOW_SEARCH") {
            config.shadow_search = flag.to_lowercase() == "true" || flag == "1";
        }

        Ok(config)
    }

    /// Validated coordinator settings
    pub fn coordinator_config(&self) -> Result<CoordinatorConfig> {
        CoordinatorConfigBuilder::new()
            .engines(self.engines.iter().copied())
            .stat_interval_secs(self.stat_interval_secs)
            .shadow_search(self.shadow_search)
            .build()
            .context("Invalid coordinator configuration")
    }
}
