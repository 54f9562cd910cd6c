//! Outbound Ports (Driven Ports)
//!
//! These traits define what the filtering subsystem needs from the outside
//! world: a place to load the initial subscription set from.

use async_trait::async_trait;

use crate::domain::Subscriptions;
use crate::error::FilterError;

/// Supplier of the subscription snapshot engines are built from
#[async_trait]
pub trait SubscriptionSource: Send + Sync {
    /// Load every configured subscription
    ///
    /// Patterns must be over `{0, 1}`; anything else is rejected with
    /// `InvalidPattern`.
    async fn load(&self) -> Result<Subscriptions, FilterError>;
}
