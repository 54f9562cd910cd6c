//! Error types for the filter engine subsystem

use crate::domain::engines::EngineKind;
use crate::domain::lifecycle::{EngineState, LifecycleEvent};
use thiserror::Error;

/// Errors that can occur in the filter engine subsystem
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Invalid pattern {pattern:?}: unexpected character {found:?} at bit {position}")]
    InvalidPattern {
        pattern: String,
        found: char,
        position: usize,
    },

    #[error("Empty subscription pattern")]
    EmptyPattern,

    #[error("Cannot compose an empty filter set")]
    EmptyFilterSet,

    #[error("Filters do not overlap: head byte {head} >= tail byte {tail}")]
    NoOverlap { head: usize, tail: usize },

    #[error("Subscription not found: {pattern} -> {report_uri}")]
    NotFound { pattern: String, report_uri: String },

    #[error("Engine blob type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid transition: {event:?} is not accepted in state {state:?}")]
    InvalidTransition {
        state: EngineState,
        event: LifecycleEvent,
    },

    #[error("No engine is ready to serve searches")]
    NoEngineReady,

    #[error("Engine not registered: {0}")]
    EngineNotRegistered(EngineKind),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Subscription source error: {0}")]
    Source(#[from] SourceError),
}

impl From<bincode::Error> for FilterError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Errors from subscription sources
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line {line}: {reason}")]
    Parse { line: usize, reason: String },
}
