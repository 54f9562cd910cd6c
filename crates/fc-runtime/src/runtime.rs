//! The runtime orchestrating subscription loading, engine builds, the
//! coordination loop and traffic replay.

use anyhow::{bail, Context, Result};
use fc_01_filter_engines::{
    CsvSubscriptionSource, EngineCoordinator, EngineKind, FilteringApi, LocalityReport,
    ManagementBusAdapter, SubscriptionSource,
};
use shared_bus::InMemoryEventBus;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{error, info};

use crate::config::RuntimeConfig;

/// Result of replaying a batch of identifiers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub events: u64,
    pub matched: u64,
    pub reports: u64,
}

pub struct FilterRuntime {
    bus: Arc<InMemoryEventBus>,
    coordinator: Arc<EngineCoordinator>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl FilterRuntime {
    /// Load subscriptions and set up the coordinator.
    pub async fn new(config: &RuntimeConfig) -> Result<Self> {
        let coordinator_config = config.coordinator_config()?;

        let source = CsvSubscriptionSource::new(&config.subscriptions);
        let subscriptions = source
            .load()
            .await
            .with_context(|| format!("Failed to load {}", config.subscriptions.display()))?;

        let bus = Arc::new(InMemoryEventBus::with_capacity(
            coordinator_config.channel_capacity,
        ));
        let coordinator = Arc::new(EngineCoordinator::new(
            coordinator_config,
            subscriptions,
            bus.clone(),
        )?);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            bus,
            coordinator,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Start the coordination loop, then the engine builds.
    pub fn start(&self) -> Result<()> {
        info!("===========================================");
        info!("  FC Filtering Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        // Subscribe before any build can announce itself
        let adapter = ManagementBusAdapter::new(&self.bus, Arc::clone(&self.coordinator));
        let mut shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = adapter.run() => {}
                _ = shutdown.changed() => {
                    info!("[fc-01] Shutdown signal received");
                }
            }
        });

        let builds = self.coordinator.start()?;
        tokio::spawn(async move {
            for build in builds {
                if let Err(e) = build.await {
                    error!("Engine build task failed: {}", e);
                }
            }
        });

        Ok(())
    }

    /// Wait until some engine serves searches.
    pub async fn wait_for_engine(&self, timeout: Duration) -> Result<EngineKind> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(kind) = self.coordinator.current_engine() {
                return Ok(kind);
            }
            if Instant::now() >= deadline {
                bail!("No engine ready after {:?}", timeout);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Search every identifier through the current engine.
    pub fn replay(&self, ids: &[Vec<u8>]) -> Result<ReplaySummary> {
        let mut summary = ReplaySummary::default();
        for id in ids {
            let uris = self.coordinator.search(id)?;
            summary.events += 1;
            if !uris.is_empty() {
                summary.matched += 1;
                summary.reports += uris.len() as u64;
            }
        }
        Ok(summary)
    }

    /// Locality report of `ids` against the current engine.
    pub fn locality(&self, ids: &[Vec<u8>]) -> Result<LocalityReport> {
        Ok(self.coordinator.analyze_locality(ids)?)
    }

    pub async fn write_locality(&self, ids: &[Vec<u8>], path: &Path) -> Result<()> {
        let json = self.locality(ids)?.to_json_pretty()?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), samples = ids.len(), "Locality report written");
        Ok(())
    }

    pub fn coordinator(&self) -> Arc<EngineCoordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Stop the coordination loop.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");

        // Final statistics window
        self.coordinator.publish_stats();

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
        tokio::task::yield_now().await;

        info!("Shutdown complete");
    }
}
