//! Engine lifecycle state machine
//!
//! One lifecycle per registered engine variant. Builds and incremental
//! updates run while the engine is out of service; only a `Ready` or
//! `Deployed` engine answers searches.

use crate::error::FilterError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of one engine
///
/// State Machine:
/// ```text
/// [UNAVAILABLE] ──init──→ [GENERATING] ──generated──→ [READY] ──deploy──→ [DEPLOYED]
///                              │                      │  ↑                   │  │
///                              │                      │  └───────retire──────┘  │
///                              └──────update──→ [PENDING] ←─────update──────────┘
///                                                │  ↑ │
///                                                │  └─┘ update
///                                                └──generated──→ [READY]
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineState {
    /// Nothing built yet
    #[default]
    Unavailable,
    /// Initial build in progress
    Generating,
    /// Incremental changes being applied
    Pending,
    /// Built and searchable, not serving traffic
    Ready,
    /// Serving traffic
    Deployed,
}

impl EngineState {
    /// Whether an engine in this state has a complete structure to search
    pub fn is_searchable(self) -> bool {
        matches!(self, Self::Ready | Self::Deployed)
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unavailable => "unavailable",
            Self::Generating => "generating",
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Deployed => "deployed",
        };
        f.write_str(name)
    }
}

/// Events that drive [`EngineState`] transitions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleEvent {
    /// Start the initial build from a subscription snapshot
    Init,
    /// A build or update completed
    Generated,
    /// Start serving traffic
    Deploy,
    /// A subscription was added or deleted
    Update,
    /// Another engine took over the traffic
    Retire,
}

/// State machine for one engine
#[derive(Debug, Default)]
pub struct EngineLifecycle {
    state: EngineState,
    transitions: u64,
}

impl EngineLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Number of accepted transitions
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Apply an event.
    ///
    /// An event with no transition from the current state is rejected and
    /// the state is left unchanged.
    pub fn fire(&mut self, event: LifecycleEvent) -> Result<EngineState, FilterError> {
        let next = Self::next_state(self.state, event).ok_or(FilterError::InvalidTransition {
            state: self.state,
            event,
        })?;
        self.state = next;
        self.transitions += 1;
        Ok(next)
    }

    /// Whether `event` would be accepted in the current state
    pub fn can_fire(&self, event: LifecycleEvent) -> bool {
        Self::next_state(self.state, event).is_some()
    }

    /// Transition table
    pub fn next_state(state: EngineState, event: LifecycleEvent) -> Option<EngineState> {
        use EngineState::*;
        use LifecycleEvent::*;

        match (state, event) {
            (Unavailable, Init) => Some(Generating),
            (Generating | Pending, Generated) => Some(Ready),
            (Ready, Deploy) => Some(Deployed),
            (Generating | Pending | Ready | Deployed, Update) => Some(Pending),
            (Deployed, Retire) => Some(Ready),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn force_state(&mut self, state: EngineState) {
        self.state = state;
    }
}
