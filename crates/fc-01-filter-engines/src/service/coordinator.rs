//! Engine Coordinator
//!
//! Owns one [`EngineGenerator`] per enabled variant and decides which built
//! engine serves traffic. Subscription changes are fanned out to every
//! generator, so any of them can take over without losing state.
//!
//! ## Selection
//!
//! On each `EngineGenerated`:
//! 1. Nothing deployed yet: adopt the candidate.
//! 2. Candidate already current: redeploy it after its update.
//! 3. Otherwise adopt only if its priority is strictly higher, retiring the
//!    engine it replaces.

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use shared_bus::{InMemoryEventBus, ManagementEvent};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::generator::{EngineGenerator, SubscriptionChange};
use crate::domain::{
    CoordinatorConfig, EngineKind, EngineState, LocalityAnalyzer, LocalityReport, Subscriptions,
};
use crate::error::FilterError;
use crate::ports::FilteringApi;

/// Whether a candidate with `candidate` priority displaces the current one
pub fn should_replace(current: u8, candidate: u8) -> bool {
    candidate > current
}

pub struct EngineCoordinator {
    config: CoordinatorConfig,
    generators: BTreeMap<EngineKind, Arc<EngineGenerator>>,
    /// Top-level subscriptions; also serializes changes across generators
    subscriptions: Mutex<Subscriptions>,
    current: ArcSwapOption<EngineGenerator>,
    /// Last reported search cost per engine (microseconds per event)
    throughput: Mutex<BTreeMap<EngineKind, f64>>,
    bus: Arc<InMemoryEventBus>,
}

impl EngineCoordinator {
    pub fn new(
        config: CoordinatorConfig,
        subscriptions: Subscriptions,
        bus: Arc<InMemoryEventBus>,
    ) -> Result<Self, FilterError> {
        config.validate()?;

        let generators = config
            .engines
            .iter()
            .map(|&kind| (kind, Arc::new(EngineGenerator::new(kind, bus.clone()))))
            .collect();

        Ok(Self {
            config,
            generators,
            subscriptions: Mutex::new(subscriptions),
            current: ArcSwapOption::empty(),
            throughput: Mutex::new(BTreeMap::new()),
            bus,
        })
    }

    /// Start building every enabled engine from the current subscriptions
    pub fn start(&self) -> Result<Vec<JoinHandle<()>>, FilterError> {
        let subscriptions = self.subscriptions.lock();
        info!(
            engines = self.generators.len(),
            subscriptions = subscriptions.len(),
            "Starting engine builds"
        );

        self.generators
            .values()
            .map(|generator| generator.init(subscriptions.clone()))
            .collect()
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn generator(&self, kind: EngineKind) -> Result<&Arc<EngineGenerator>, FilterError> {
        self.generators
            .get(&kind)
            .ok_or(FilterError::EngineNotRegistered(kind))
    }

    pub fn generators(&self) -> impl Iterator<Item = &Arc<EngineGenerator>> {
        self.generators.values()
    }

    /// Snapshot of the top-level subscriptions
    pub fn subscriptions(&self) -> Subscriptions {
        self.subscriptions.lock().clone()
    }

    /// Structure of the engine serving traffic
    pub fn dump(&self) -> Option<String> {
        self.current
            .load_full()
            .and_then(|current| current.with_engine(|engine| engine.dump()))
    }

    /// Handle a finished build or update of `kind`
    ///
    /// # Returns
    /// `true` if `kind` became the current engine
    pub fn on_engine_generated(&self, kind: EngineKind) -> Result<bool, FilterError> {
        let candidate = self.generator(kind)?;
        if candidate.state() != EngineState::Ready {
            debug!(engine = %kind, state = %candidate.state(), "Stale generated event");
            return Ok(false);
        }

        let previous = self.current.load_full();
        if let Some(current) = &previous {
            if current.kind() == kind {
                candidate.deploy()?;
                debug!(engine = %kind, "Current engine redeployed");
                return Ok(false);
            }

            let current_priority = self.config.priority(current.kind());
            let candidate_priority = self.config.priority(kind);
            if !should_replace(current_priority, candidate_priority) {
                debug!(
                    engine = %kind,
                    current = %current.kind(),
                    candidate_priority,
                    current_priority,
                    "Keeping current engine"
                );
                return Ok(false);
            }
        }

        candidate.deploy()?;
        self.current.store(Some(Arc::clone(candidate)));

        if let Some(previous) = &previous {
            if previous.state() == EngineState::Deployed {
                if let Err(e) = previous.retire() {
                    warn!(engine = %previous.kind(), error = %e, "Retire failed");
                }
            }
        }

        info!(
            engine = %kind,
            previous = ?previous.as_ref().map(|p| p.kind()),
            "Selected engine"
        );
        self.bus.publish_now(ManagementEvent::SelectedEngine {
            engine: kind.name().to_string(),
        });
        Ok(true)
    }

    pub fn record_throughput(&self, kind: EngineKind, micros_per_event: f64) {
        debug!(engine = %kind, micros_per_event, "Engine throughput");
        self.throughput.lock().insert(kind, micros_per_event);
    }

    pub fn throughput(&self, kind: EngineKind) -> Option<f64> {
        self.throughput.lock().get(&kind).copied()
    }

    /// Publish a statistics window for every built engine
    pub fn publish_stats(&self) {
        for generator in self.generators.values().filter(|g| g.is_searchable()) {
            generator.report_stats();
        }
    }

    fn broadcast(&self, change: &SubscriptionChange) {
        for generator in self.generators.values() {
            if let Err(e) = generator.update(change) {
                warn!(engine = %generator.kind(), error = %e, "Update not applied");
            }
        }
    }
}

impl FilteringApi for EngineCoordinator {
    fn search(&self, id: &[u8]) -> Result<Vec<String>, FilterError> {
        let current = self.current.load_full().ok_or(FilterError::NoEngineReady)?;
        let uris = current.search(id).ok_or(FilterError::NoEngineReady)?;

        if self.config.shadow_search {
            for generator in self.generators.values() {
                if generator.kind() != current.kind() {
                    // Only feeds the shadow engine's statistics
                    let _ = generator.search(id);
                }
            }
        }

        Ok(uris)
    }

    fn add_subscription(&self, pattern: &str, report_uri: &str) -> Result<bool, FilterError> {
        let mut subscriptions = self.subscriptions.lock();

        let weight = match subscriptions.get(pattern) {
            Some(existing) if existing.report_uri == report_uri => {
                debug!(pattern, report_uri, "Duplicate subscription ignored");
                return Ok(false);
            }
            Some(existing) => existing.weight,
            None => 0.0,
        };
        subscriptions.insert(pattern, report_uri, weight)?;

        info!(pattern, report_uri, "Subscription added");
        self.broadcast(&SubscriptionChange::add(pattern, report_uri));
        Ok(true)
    }

    fn delete_subscription(&self, pattern: &str, report_uri: &str) -> Result<(), FilterError> {
        let mut subscriptions = self.subscriptions.lock();

        match subscriptions.get(pattern) {
            Some(existing) if existing.report_uri == report_uri => {
                subscriptions.remove(pattern);
            }
            _ => {
                return Err(FilterError::NotFound {
                    pattern: pattern.to_string(),
                    report_uri: report_uri.to_string(),
                })
            }
        }

        info!(pattern, report_uri, "Subscription deleted");
        self.broadcast(&SubscriptionChange::delete(pattern, report_uri));
        Ok(())
    }

    fn current_engine(&self) -> Option<EngineKind> {
        self.current.load().as_ref().map(|current| current.kind())
    }

    fn analyze_locality(&self, samples: &[Vec<u8>]) -> Result<LocalityReport, FilterError> {
        let current = self.current.load_full().ok_or(FilterError::NoEngineReady)?;
        current
            .with_engine(|engine| {
                LocalityAnalyzer::analyze(engine, samples.iter().map(Vec::as_slice))
            })
            .ok_or(FilterError::NoEngineReady)
    }
}
