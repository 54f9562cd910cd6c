//! Inbound Ports (Driving Ports)
//!
//! These traits define the API that the traffic path and the management
//! surface use to interact with the filtering engines.

use crate::domain::{EngineKind, LocalityReport};
use crate::error::FilterError;

/// Primary filtering API (Driving Port)
pub trait FilteringApi: Send + Sync {
    /// Report URIs of every subscription matching `id`
    ///
    /// Served by the currently deployed engine. Identifiers shorter than a
    /// pattern simply do not match it.
    fn search(&self, id: &[u8]) -> Result<Vec<String>, FilterError>;

    /// Route identifiers matching `pattern` to `report_uri`
    ///
    /// # Returns
    /// `false` if the exact pair was already subscribed and nothing changed
    fn add_subscription(&self, pattern: &str, report_uri: &str) -> Result<bool, FilterError>;

    /// Remove the subscription `pattern -> report_uri`
    ///
    /// Fails with `NotFound` unless both the pattern and its URI match.
    fn delete_subscription(&self, pattern: &str, report_uri: &str) -> Result<(), FilterError>;

    /// Engine currently serving searches, if any
    fn current_engine(&self) -> Option<EngineKind>;

    /// Replay identifier samples through the current engine without
    /// modifying it and report per-node usage
    fn analyze_locality(&self, samples: &[Vec<u8>]) -> Result<LocalityReport, FilterError>;
}
