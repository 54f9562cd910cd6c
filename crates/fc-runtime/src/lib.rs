//! # FC Runtime
//!
//! Wires the filtering engines into a process:
//!
//! 1. Load configuration from the environment
//! 2. Load subscriptions from CSV
//! 3. Start the coordination loop on the management bus
//! 4. Build every enabled engine in the background
//! 5. Replay traffic and write the locality report, if configured

pub mod config;
pub mod runtime;
pub mod traffic;

pub use config::RuntimeConfig;
pub use runtime::{FilterRuntime, ReplaySummary};
pub use traffic::{load_traffic, parse_traffic};
