//! # FC Runtime
//!
//! Entry point of the filtering middleware. See the library docs for the
//! startup sequence.

use anyhow::{Context, Result};
use fc_runtime::{load_traffic, FilterRuntime, RuntimeConfig};
use fc_telemetry::{init_logging, TelemetryConfig};
use std::time::Duration;
use tracing::info;

/// How long to wait for the first engine before replaying traffic
const ENGINE_READY_TIMEOUT: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(&TelemetryConfig::from_env()).context("Failed to initialize logging")?;

    let config = RuntimeConfig::from_env()?;
    let runtime = FilterRuntime::new(&config).await?;
    runtime.start()?;

    let engine = runtime.wait_for_engine(ENGINE_READY_TIMEOUT).await?;
    info!(%engine, "Serving searches");

    if let Some(path) = &config.traffic {
        let ids = load_traffic(path).await?;
        let summary = runtime.replay(&ids)?;
        info!(
            events = summary.events,
            matched = summary.matched,
            reports = summary.reports,
            "Traffic replayed"
        );

        if let Some(out) = &config.locality_out {
            runtime.write_locality(&ids, out).await?;
        }
    }

    info!("Runtime is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    Ok(())
}
