//! # Management Events
//!
//! Defines all event types that flow through the management bus: subscription
//! changes coming in from operators, engine lifecycle notifications, and
//! periodic traffic statistics.

use serde::{Deserialize, Serialize};

/// All events that can be published to the management bus.
///
/// Engines are identified by their stable names (`List`, `PatriciaTrie`,
/// `WeightedTree`, `SplayTree`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ManagementEvent {
    // =========================================================================
    // SUBSCRIPTIONS
    // =========================================================================
    /// Route identifiers matching `pattern` to `report_uri`.
    AddSubscription {
        /// Bit pattern over `{0, 1}`.
        pattern: String,
        /// Destination for matches.
        report_uri: String,
    },

    /// Stop routing `pattern` to `report_uri`.
    DeleteSubscription {
        /// Bit pattern over `{0, 1}`.
        pattern: String,
        /// Destination for matches.
        report_uri: String,
    },

    // =========================================================================
    // ENGINES
    // =========================================================================
    /// An engine finished a build or an incremental update and is ready.
    EngineGenerated {
        /// Engine name.
        engine: String,
    },

    /// The coordinator switched traffic to an engine.
    SelectedEngine {
        /// Engine name.
        engine: String,
    },

    // =========================================================================
    // TRAFFIC
    // =========================================================================
    /// Counters for one statistics window.
    TrafficStat {
        /// Engine name.
        engine: String,
        /// Identifiers searched in the window.
        event_count: u64,
        /// Searches that matched at least one subscription.
        matched_count: u64,
    },

    /// Measured search cost of an engine.
    EngineStatus {
        /// Engine name.
        engine: String,
        /// Average search time in the window.
        micros_per_event: f64,
    },
}

impl ManagementEvent {
    /// Get the topic this event belongs to.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::AddSubscription { .. } | Self::DeleteSubscription { .. } => {
                EventTopic::Subscriptions
            }
            Self::EngineGenerated { .. } | Self::SelectedEngine { .. } => EventTopic::Engines,
            Self::TrafficStat { .. } | Self::EngineStatus { .. } => EventTopic::Traffic,
        }
    }

    /// Whether the coordination loop must act on this event.
    ///
    /// Commands travel over the lossless command queue as well as the
    /// broadcast channel.
    #[must_use]
    pub fn is_command(&self) -> bool {
        !matches!(self, Self::SelectedEngine { .. } | Self::TrafficStat { .. })
    }

    /// Get the engine this event concerns, if any.
    #[must_use]
    pub fn engine(&self) -> Option<&str> {
        match self {
            Self::AddSubscription { .. } | Self::DeleteSubscription { .. } => None,
            Self::EngineGenerated { engine }
            | Self::SelectedEngine { engine }
            | Self::TrafficStat { engine, .. }
            | Self::EngineStatus { engine, .. } => Some(engine),
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Subscription add/delete requests.
    Subscriptions,
    /// Engine lifecycle notifications.
    Engines,
    /// Traffic statistics.
    Traffic,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Engines to include. Empty means all engines; events that concern no
    /// engine always pass.
    pub engines: Vec<String>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            engines: Vec::new(),
        }
    }

    /// Create a filter for events about specific engines.
    #[must_use]
    pub fn for_engines<I, S>(engines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            topics: Vec::new(),
            engines: engines.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &ManagementEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let engine_match = self.engines.is_empty()
            || event
                .engine()
                .map_or(true, |engine| self.engines.iter().any(|e| e == engine));

        topic_match && engine_match
    }
}
