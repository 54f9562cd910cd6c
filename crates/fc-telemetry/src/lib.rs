//! # FC Telemetry
//!
//! Logging setup shared by the FC binaries and integration tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fc_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     init_logging(&config).expect("Failed to init logging");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `FC_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `FC_JSON_LOGS` | `false` | One JSON object per line |
//! | `FC_SERVICE_NAME` | `fc-runtime` | Service name field |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::init_logging;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter {filter:?}: {reason}")]
    Filter { filter: String, reason: String },

    #[error("Failed to install subscriber: {0}")]
    Install(String),
}
