//! # FC Test Suite
//!
//! Cross-crate tests that exercise the engines, the coordinator and the
//! management bus together.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── coordinator_flow.rs    # Bus-driven selection and updates
//!     ├── engine_equivalence.rs  # All variants agree on random inputs
//!     └── locality_flow.rs       # Locality report over replayed traffic
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p fc-tests
//! cargo test -p fc-tests integration::engine_equivalence
//! ```

pub mod integration;
