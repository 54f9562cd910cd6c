//! # Event Subscriber
//!
//! Receiving side of the management bus: filtered observers over the
//! broadcast ring, and the lossless command stream of the coordination loop.

use crate::events::{EventFilter, ManagementEvent};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::warn;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The event bus was closed, or the stream was detached from it.
    #[error("Event bus closed")]
    Closed,
}

/// Filtered view of the broadcast ring.
///
/// An observer that falls more than the ring capacity behind skips the
/// events it missed and logs how many.
pub struct Subscription {
    receiver: broadcast::Receiver<ManagementEvent>,
    filter: EventFilter,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<ManagementEvent>, filter: EventFilter) -> Self {
        Self { receiver, filter }
    }

    /// Next event that matches the filter, `None` once the bus is dropped.
    pub async fn recv(&mut self) -> Option<ManagementEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Observer lagged behind the bus, events skipped");
                }
            }
        }
    }

    /// Next matching event if one is already buffered.
    pub fn try_recv(&mut self) -> Result<Option<ManagementEvent>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Ok(Some(event)),
                Ok(_) => {}
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    warn!(missed, "Observer lagged behind the bus, events skipped");
                }
            }
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

/// Every command published after the stream was attached, in order.
pub struct CommandStream {
    receiver: mpsc::UnboundedReceiver<ManagementEvent>,
}

impl CommandStream {
    pub(crate) fn new(receiver: mpsc::UnboundedReceiver<ManagementEvent>) -> Self {
        Self { receiver }
    }

    /// Next command, `None` once the bus is dropped or the stream detached.
    pub async fn recv(&mut self) -> Option<ManagementEvent> {
        self.receiver.recv().await
    }

    /// Next command if one is already queued.
    pub fn try_recv(&mut self) -> Result<Option<ManagementEvent>, SubscriptionError> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(SubscriptionError::Closed),
        }
    }
}
