//! Engine Generator
//!
//! Owns one engine variant for its whole life: builds it in the background,
//! keeps it consistent with subscription changes, serves searches from it
//! and reports its traffic counters.
//!
//! ```text
//!  init(subs) ──► Generating ──build on blocking pool──► install ──► Ready
//!                     │                                   ▲
//!              update │ (queued)          backlog applied │
//!                     ▼                                   │
//!                  Pending ───────────────────────────────┘
//! ```

use parking_lot::{Mutex, RwLock};
use shared_bus::{InMemoryEventBus, ManagementEvent};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::domain::{
    EngineKind, EngineLifecycle, EngineState, FilterEngine, LifecycleEvent, Subscriptions,
};
use crate::error::FilterError;
use crate::metrics::{TrafficMetrics, TrafficSnapshot};

/// A single incremental subscription change
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubscriptionChange {
    Add { pattern: String, report_uri: String },
    Delete { pattern: String, report_uri: String },
}

impl SubscriptionChange {
    pub fn add(pattern: impl Into<String>, report_uri: impl Into<String>) -> Self {
        Self::Add {
            pattern: pattern.into(),
            report_uri: report_uri.into(),
        }
    }

    pub fn delete(pattern: impl Into<String>, report_uri: impl Into<String>) -> Self {
        Self::Delete {
            pattern: pattern.into(),
            report_uri: report_uri.into(),
        }
    }

    fn apply(&self, engine: &mut FilterEngine) -> Result<(), FilterError> {
        match self {
            Self::Add {
                pattern,
                report_uri,
            } => {
                engine.add(pattern, report_uri);
                Ok(())
            }
            Self::Delete {
                pattern,
                report_uri,
            } => engine.delete(pattern, report_uri),
        }
    }
}

#[derive(Debug, Default)]
struct GeneratorState {
    lifecycle: EngineLifecycle,
    /// Changes received while a build was in flight
    backlog: Vec<SubscriptionChange>,
}

/// Lifecycle, engine and counters of one variant
///
/// Lock order is FSM state first, then engine.
pub struct EngineGenerator {
    kind: EngineKind,
    state: Mutex<GeneratorState>,
    engine: RwLock<Option<FilterEngine>>,
    metrics: TrafficMetrics,
    bus: Arc<InMemoryEventBus>,
}

impl EngineGenerator {
    pub fn new(kind: EngineKind, bus: Arc<InMemoryEventBus>) -> Self {
        Self {
            kind,
            state: Mutex::new(GeneratorState::default()),
            engine: RwLock::new(None),
            metrics: TrafficMetrics::new(),
            bus,
        }
    }

    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    pub fn state(&self) -> EngineState {
        self.state.lock().lifecycle.state()
    }

    pub fn is_searchable(&self) -> bool {
        self.state().is_searchable()
    }

    pub fn metrics(&self) -> &TrafficMetrics {
        &self.metrics
    }

    /// Start building from a snapshot of `subscriptions`
    ///
    /// The build runs on the blocking pool; the returned handle completes
    /// once the engine is installed and `EngineGenerated` is published.
    pub fn init(
        self: &Arc<Self>,
        subscriptions: Subscriptions,
    ) -> Result<JoinHandle<()>, FilterError> {
        self.state.lock().lifecycle.fire(LifecycleEvent::Init)?;
        info!(
            engine = %self.kind,
            subscriptions = subscriptions.len(),
            "Building engine"
        );

        let generator = Arc::clone(self);
        Ok(tokio::task::spawn_blocking(move || {
            let start = Instant::now();
            let engine = FilterEngine::build(generator.kind, &subscriptions);
            generator.install(engine, start.elapsed());
        }))
    }

    fn install(&self, mut engine: FilterEngine, build_time: Duration) {
        let mut state = self.state.lock();

        let backlog = std::mem::take(&mut state.backlog);
        let queued = backlog.len();
        for change in backlog {
            if let Err(e) = change.apply(&mut engine) {
                warn!(engine = %self.kind, error = %e, "Queued change not applied");
            }
        }

        let nodes = engine.len();
        *self.engine.write() = Some(engine);

        if let Err(e) = state.lifecycle.fire(LifecycleEvent::Generated) {
            warn!(engine = %self.kind, error = %e, "Engine built in unexpected state");
            return;
        }
        drop(state);

        info!(
            engine = %self.kind,
            nodes,
            queued,
            build_ms = build_time.as_millis() as u64,
            "Engine generated"
        );
        self.publish_generated();
    }

    /// Apply one subscription change
    ///
    /// While a build is in flight the change is queued and applied before
    /// the engine becomes ready. Otherwise it is applied in place and
    /// `EngineGenerated` is published again.
    pub fn update(&self, change: &SubscriptionChange) -> Result<(), FilterError> {
        let mut state = self.state.lock();
        let previous = state.lifecycle.state();
        state.lifecycle.fire(LifecycleEvent::Update)?;

        if matches!(previous, EngineState::Generating | EngineState::Pending) {
            debug!(engine = %self.kind, ?change, "Build in flight, change queued");
            state.backlog.push(change.clone());
            return Ok(());
        }

        let applied = match self.engine.write().as_mut() {
            Some(engine) => change.apply(engine),
            None => Ok(()),
        };
        state.lifecycle.fire(LifecycleEvent::Generated)?;
        drop(state);

        debug!(engine = %self.kind, ?change, "Change applied");
        self.publish_generated();
        applied
    }

    pub fn deploy(&self) -> Result<(), FilterError> {
        self.state.lock().lifecycle.fire(LifecycleEvent::Deploy)?;
        info!(engine = %self.kind, "Engine deployed");
        Ok(())
    }

    pub fn retire(&self) -> Result<(), FilterError> {
        self.state.lock().lifecycle.fire(LifecycleEvent::Retire)?;
        info!(engine = %self.kind, "Engine retired");
        Ok(())
    }

    /// Search `id`, `None` if the engine is not built yet
    ///
    /// The splay variant reorganizes on search and takes the write lock.
    pub fn search(&self, id: &[u8]) -> Option<Vec<String>> {
        if !self.is_searchable() {
            return None;
        }

        let start = Instant::now();
        let uris = if self.kind.is_self_adjusting() {
            let mut guard = self.engine.write();
            let engine = guard.as_mut()?;
            engine.search_adaptive(id)
        } else {
            let guard = self.engine.read();
            let engine = guard.as_ref()?;
            engine.search(id)
        };
        self.metrics.record_search(start.elapsed(), !uris.is_empty());

        trace!(engine = %self.kind, matches = uris.len(), "Search");
        Some(uris)
    }

    /// Run `f` against the built engine under the read lock
    pub fn with_engine<R>(&self, f: impl FnOnce(&FilterEngine) -> R) -> Option<R> {
        self.engine.read().as_ref().map(f)
    }

    /// Take the current statistics window and publish it
    pub fn report_stats(&self) -> TrafficSnapshot {
        let window = self.metrics.take_window();
        let engine = self.kind.name().to_string();

        self.bus.publish_now(ManagementEvent::TrafficStat {
            engine: engine.clone(),
            event_count: window.events,
            matched_count: window.matched,
        });
        if let Some(micros_per_event) = window.micros_per_event() {
            self.bus.publish_now(ManagementEvent::EngineStatus {
                engine,
                micros_per_event,
            });
        }

        window
    }

    fn publish_generated(&self) {
        self.bus.publish_now(ManagementEvent::EngineGenerated {
            engine: self.kind.name().to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_bus::{EventFilter, EventTopic};

    fn subscriptions() -> Subscriptions {
        let mut subs = Subscriptions::new();
        subs.insert("0011", "A", 1.0).unwrap();
        subs.insert("00110000", "A2", 0.0).unwrap();
        subs.insert("1111", "B", 0.5).unwrap();
        subs
    }

    fn generator(kind: EngineKind) -> (Arc<EngineGenerator>, Arc<InMemoryEventBus>) {
        let bus = Arc::new(InMemoryEventBus::new());
        (Arc::new(EngineGenerator::new(kind, bus.clone())), bus)
    }

    #[tokio::test]
    async fn test_init_builds_and_announces() {
        let (generator, bus) = generator(EngineKind::PatriciaTrie);
        let mut events = bus.subscribe(EventFilter::topics(vec![EventTopic::Engines]));

        assert_eq!(generator.search(&[0x30]), None);
        generator.init(subscriptions()).unwrap().await.unwrap();

        assert_eq!(generator.state(), EngineState::Ready);
        assert_eq!(
            events.try_recv().unwrap(),
            Some(ManagementEvent::EngineGenerated {
                engine: "PatriciaTrie".to_string()
            })
        );

        let mut uris = generator.search(&[0x30]).unwrap();
        uris.sort();
        assert_eq!(uris, ["A", "A2"]);
    }

    #[tokio::test]
    async fn test_init_twice_rejected() {
        let (generator, _bus) = generator(EngineKind::List);
        generator.init(subscriptions()).unwrap().await.unwrap();

        let err = generator.init(subscriptions()).unwrap_err();
        assert!(matches!(err, FilterError::InvalidTransition { .. }));
        assert_eq!(generator.state(), EngineState::Ready);
    }

    #[test]
    fn test_update_before_init_rejected() {
        let (generator, _bus) = generator(EngineKind::List);
        let err = generator
            .update(&SubscriptionChange::add("0101", "C"))
            .unwrap_err();
        assert!(matches!(
            err,
            FilterError::InvalidTransition {
                state: EngineState::Unavailable,
                event: LifecycleEvent::Update
            }
        ));
    }

    #[test]
    fn test_changes_queued_during_build() {
        let (generator, bus) = generator(EngineKind::WeightedTree);
        let mut events = bus.subscribe(EventFilter::all());

        generator.state.lock().lifecycle.fire(LifecycleEvent::Init).unwrap();
        generator
            .update(&SubscriptionChange::add("0101", "C"))
            .unwrap();
        generator
            .update(&SubscriptionChange::delete("1111", "B"))
            .unwrap();
        assert_eq!(generator.state(), EngineState::Pending);
        assert_eq!(generator.search(&[0x50]), None);
        assert_eq!(events.try_recv().unwrap(), None);

        let engine = FilterEngine::build(EngineKind::WeightedTree, &subscriptions());
        generator.install(engine, Duration::ZERO);

        assert_eq!(generator.state(), EngineState::Ready);
        assert_eq!(generator.search(&[0x50]).unwrap(), ["C"]);
        assert!(generator.search(&[0xF0]).unwrap().is_empty());
        assert!(matches!(
            events.try_recv().unwrap(),
            Some(ManagementEvent::EngineGenerated { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_applied_in_place() {
        let (generator, bus) = generator(EngineKind::List);
        generator.init(subscriptions()).unwrap().await.unwrap();
        generator.deploy().unwrap();

        let mut events = bus.subscribe(EventFilter::all());
        generator
            .update(&SubscriptionChange::add("0101", "C"))
            .unwrap();

        // An update leaves a deployed engine ready for redeployment
        assert_eq!(generator.state(), EngineState::Ready);
        assert_eq!(generator.search(&[0x50]).unwrap(), ["C"]);
        assert_eq!(
            events.try_recv().unwrap(),
            Some(ManagementEvent::EngineGenerated {
                engine: "List".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_failed_delete_still_returns_to_ready() {
        let (generator, _bus) = generator(EngineKind::PatriciaTrie);
        generator.init(subscriptions()).unwrap().await.unwrap();

        let err = generator
            .update(&SubscriptionChange::delete("0011", "wrong"))
            .unwrap_err();
        assert!(matches!(err, FilterError::NotFound { .. }));
        assert_eq!(generator.state(), EngineState::Ready);
    }

    #[tokio::test]
    async fn test_splay_search_records_metrics() {
        let (generator, _bus) = generator(EngineKind::SplayTree);
        generator.init(subscriptions()).unwrap().await.unwrap();

        generator.search(&[0xF0]).unwrap();
        generator.search(&[0x00]).unwrap();

        let snapshot = generator.metrics().snapshot();
        assert_eq!(snapshot.events, 2);
        assert_eq!(snapshot.matched, 1);
        assert!(generator
            .with_engine(|engine| engine.dump().starts_with("--1111(0 4) -> B"))
            .unwrap());
    }

    #[tokio::test]
    async fn test_report_stats_publishes_window() {
        let (generator, bus) = generator(EngineKind::List);
        generator.init(subscriptions()).unwrap().await.unwrap();
        let mut traffic = bus.subscribe(EventFilter::topics(vec![EventTopic::Traffic]));

        generator.search(&[0x30]).unwrap();
        let window = generator.report_stats();
        assert_eq!(window.events, 1);

        assert_eq!(
            traffic.try_recv().unwrap(),
            Some(ManagementEvent::TrafficStat {
                engine: "List".to_string(),
                event_count: 1,
                matched_count: 1,
            })
        );
        assert!(matches!(
            traffic.try_recv().unwrap(),
            Some(ManagementEvent::EngineStatus { .. })
        ));

        // Empty window: counters only
        generator.report_stats();
        assert!(matches!(
            traffic.try_recv().unwrap(),
            Some(ManagementEvent::TrafficStat { event_count: 0, .. })
        ));
        assert_eq!(traffic.try_recv().unwrap(), None);
    }
}
