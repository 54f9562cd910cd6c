//! Service Layer
//!
//! Contains the application services that orchestrate domain logic:
//! per-variant generators and the coordinator choosing between them.

pub mod coordinator;
pub mod generator;

pub use coordinator::{should_replace, EngineCoordinator};
pub use generator::{EngineGenerator, SubscriptionChange};
