//! # FC-01 Filter Engines
//!
//! Content-based filtering of RFID tag identifiers: every subscription is a
//! bit pattern plus a report URI, and a search returns the URIs of all
//! patterns that match an identifier's bits.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): Pure matching logic, no I/O
//!   - `BitFilter`: Byte-aligned bit pattern at a bit offset
//!   - `Composition`: Common filter of a set plus per-member residues
//!   - `FilterEngine`: `List`, `PatriciaTrie`, `WeightedTree`, `SplayTree`
//!   - `EngineLifecycle`: Build/update/deploy state machine
//!   - `LocalityAnalyzer`: Per-node usage report over sample traffic
//!   - `CoordinatorConfig`: Configuration with validation
//!
//! - **Ports Layer** (`ports/`): Trait definitions
//!   - `FilteringApi`: Driving port (search and subscription management)
//!   - `SubscriptionSource`: Driven port (initial subscriptions)
//!
//! - **Service Layer** (`service/`): Orchestration
//!   - `EngineGenerator`: One variant's lifecycle, engine and counters
//!   - `EngineCoordinator`: Implements `FilteringApi`, picks the live engine
//!
//! - **Adapters Layer** (`adapters/`): External connections
//!   - `ManagementBusAdapter`: Coordination loop over the shared bus
//!   - `CsvSubscriptionSource`: Subscriptions from a CSV file
//!
//! ## Invariants
//!
//! - Every engine variant returns the same set of URIs for the same
//!   identifier and subscriptions; only the order may differ.
//! - An identifier too short to cover a pattern does not match it.
//! - Adding then deleting the same subscription restores the tree dump.
//! - A search never observes an engine that is being built or mutated.
//!
//! ## Usage Example
//!
//! ```ignore
//! use fc_01_filter_engines::{EngineKind, FilterEngine, MatchIndex, Subscriptions};
//!
//! let mut subs = Subscriptions::new();
//! subs.insert("0011", "http://localhost/a", 1.0)?;
//! subs.insert("00110000", "http://localhost/a2", 0.0)?;
//!
//! let engine = FilterEngine::build(EngineKind::PatriciaTrie, &subs);
//! assert_eq!(engine.search(&[0x30]).len(), 2);
//! ```
//!
//! ## Wiring to Runtime
//!
//! ```ignore
//! use fc_01_filter_engines::{
//!     CoordinatorConfig, CsvSubscriptionSource, EngineCoordinator, ManagementBusAdapter,
//!     SubscriptionSource,
//! };
//! use shared_bus::InMemoryEventBus;
//! use std::sync::Arc;
//!
//! let subs = CsvSubscriptionSource::new("subscriptions.csv").load().await?;
//! let bus = Arc::new(InMemoryEventBus::new());
//! let coordinator = Arc::new(EngineCoordinator::new(
//!     CoordinatorConfig::default(),
//!     subs,
//!     bus.clone(),
//! )?);
//!
//! // Subscribe before the builds can announce themselves
//! let adapter = ManagementBusAdapter::new(&bus, coordinator.clone());
//! tokio::spawn(adapter.run());
//! coordinator.start()?;
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-exports for convenience
pub use domain::{
    BitFilter, Composition, CoordinatorConfig, CoordinatorConfigBuilder, EngineKind,
    EngineLifecycle, EngineState, FilterEngine, LifecycleEvent, LocalityAnalyzer, LocalityMap,
    LocalityReport, MatchIndex, Subscription, Subscriptions,
};
pub use error::{FilterError, SourceError};
pub use metrics::{TrafficMetrics, TrafficSnapshot};
pub use ports::{FilteringApi, SubscriptionSource};
pub use service::{EngineCoordinator, EngineGenerator, SubscriptionChange};

pub use adapters::{CsvSubscriptionSource, ManagementBusAdapter};
