//! Adapters Layer
//!
//! Connects the filtering service to the outside world.
//!
//! ## Adapters
//!
//! - `ManagementBusAdapter` - Coordination loop over the management bus
//! - `CsvSubscriptionSource` - Loads subscriptions from a CSV file

pub mod bus_adapter;
pub mod csv_source;

pub use bus_adapter::ManagementBusAdapter;
pub use csv_source::CsvSubscriptionSource;
