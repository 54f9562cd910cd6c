//! Ports Layer
//!
//! Defines the interfaces (traits) for:
//! - Driving Ports (inbound) - API for the traffic path and operators
//! - Driven Ports (outbound) - Where subscriptions come from

pub mod inbound;
pub mod outbound;

pub use inbound::FilteringApi;
pub use outbound::SubscriptionSource;
