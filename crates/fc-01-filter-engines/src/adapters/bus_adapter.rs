//! Event Bus Adapter for the filtering engines
//!
//! The single coordination loop: consumes the command stream of the bus,
//! applies subscription changes, reacts to finished builds and drives the
//! statistics ticker. Commands are handled one at a time, in arrival order,
//! and none is lost however far the loop falls behind.

use shared_bus::{CommandStream, InMemoryEventBus, ManagementEvent};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::domain::EngineKind;
use crate::error::FilterError;
use crate::ports::FilteringApi;
use crate::service::EngineCoordinator;

/// Bus adapter driving an [`EngineCoordinator`]
pub struct ManagementBusAdapter {
    coordinator: Arc<EngineCoordinator>,
    commands: CommandStream,
    stat_interval: Duration,
}

impl ManagementBusAdapter {
    /// Attach to the command stream of the bus
    ///
    /// Create the adapter before starting the coordinator so no
    /// `EngineGenerated` is missed. The bus has one command consumer;
    /// a second adapter detaches the first.
    pub fn new(bus: &InMemoryEventBus, coordinator: Arc<EngineCoordinator>) -> Self {
        let stat_interval = coordinator.config().stat_interval();
        Self {
            coordinator,
            commands: bus.subscribe_commands(),
            stat_interval,
        }
    }

    /// Start listening for events
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!("[ManagementBusAdapter] Started listening for events");

        let mut ticker = tokio::time::interval(self.stat_interval);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                event = self.commands.recv() => match event {
                    Some(event) => {
                        if let Err(e) = self.handle_event(event) {
                            error!("Error handling event: {}", e);
                        }
                    }
                    None => {
                        warn!("[ManagementBusAdapter] Command stream ended, shutting down");
                        break;
                    }
                },
                _ = ticker.tick() => self.coordinator.publish_stats(),
            }
        }
    }

    /// Handle one management event
    pub fn handle_event(&self, event: ManagementEvent) -> Result<(), FilterError> {
        match event {
            ManagementEvent::AddSubscription {
                pattern,
                report_uri,
            } => {
                self.coordinator.add_subscription(&pattern, &report_uri)?;
            }
            ManagementEvent::DeleteSubscription {
                pattern,
                report_uri,
            } => {
                self.coordinator.delete_subscription(&pattern, &report_uri)?;
            }
            ManagementEvent::EngineGenerated { engine } => {
                let kind: EngineKind = engine.parse()?;
                self.coordinator.on_engine_generated(kind)?;
            }
            ManagementEvent::EngineStatus {
                engine,
                micros_per_event,
            } => {
                let kind: EngineKind = engine.parse()?;
                self.coordinator.record_throughput(kind, micros_per_event);
            }
            ManagementEvent::TrafficStat {
                engine,
                event_count,
                matched_count,
            } => {
                debug!(%engine, event_count, matched_count, "Traffic window");
            }
            ManagementEvent::SelectedEngine { .. } => {
                // Published by the coordinator itself, never queued
            }
        }
        Ok(())
    }
}
