//! Domain Layer - Pure matching logic
//!
//! This layer contains:
//! - Bit-pattern filters and their byte/mask encoding
//! - Composite filters (shared bits factored out of a group)
//! - Subscriptions and subset linking
//! - The four matching engines
//! - Engine lifecycle state machine
//! - Locality analysis
//! - Coordinator configuration
//!
//! RULES:
//! - No I/O operations
//! - No async code
//! - Pure functions where possible

pub mod bit_filter;
pub mod composition;
pub mod config;
pub mod engines;
pub mod lifecycle;
pub mod locality;
pub mod subscription;

pub use bit_filter::{bit_at, longest_common_prefix, validate_pattern, BitFilter, WILDCARD};
pub use composition::Composition;
pub use config::{CoordinatorConfig, CoordinatorConfigBuilder, DEFAULT_CHANNEL_CAPACITY};
pub use engines::{
    EngineKind, FilterEngine, ListIndex, MatchIndex, PatriciaTrie, SplayTree, WeightedTree,
};
pub use lifecycle::{EngineLifecycle, EngineState, LifecycleEvent};
pub use locality::{LocalityAnalyzer, LocalityMap, LocalityReport};
pub use subscription::{Subscription, Subscriptions};
