//! # Event Publisher
//!
//! Publishing side of the management bus. Every event is broadcast to the
//! observers; commands are additionally queued, without loss, for the one
//! coordination loop attached through [`InMemoryEventBus::subscribe_commands`].

use crate::events::{EventFilter, ManagementEvent};
use crate::subscriber::{CommandStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, trace, warn};

/// Trait for publishing events to the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event to the bus.
    ///
    /// # Returns
    ///
    /// The number of broadcast observers that received the event.
    async fn publish(&self, event: ManagementEvent) -> usize;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;
}

/// In-memory management bus.
///
/// Observers share a bounded `tokio::sync::broadcast` ring and may lose the
/// oldest events when they fall behind. The command queue is an unbounded
/// `mpsc` channel with a single consumer and never drops.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<ManagementEvent>,
    commands: Mutex<Option<mpsc::UnboundedSender<ManagementEvent>>>,
    events_published: AtomicU64,
    capacity: usize,
}

impl InMemoryEventBus {
    /// Create a new in-memory event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory event bus with the given broadcast capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            commands: Mutex::new(None),
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Observe events matching a filter.
    ///
    /// Only events published after this call are delivered.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(topics = ?filter.topics, engines = ?filter.engines, "New subscription created");
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// Attach the consumer of the command queue.
    ///
    /// Commands published from now on are delivered in order and none is
    /// dropped. Attaching again closes the previous stream.
    #[must_use]
    pub fn subscribe_commands(&self) -> CommandStream {
        let (sender, receiver) = mpsc::unbounded_channel();
        let previous = self
            .commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(sender);
        if previous.is_some() {
            warn!("Command stream replaced, previous consumer detached");
        }
        CommandStream::new(receiver)
    }

    /// Publish without awaiting, for callers outside an async context.
    pub fn publish_now(&self, event: ManagementEvent) -> usize {
        let topic = event.topic();
        self.events_published.fetch_add(1, Ordering::Relaxed);

        if event.is_command() {
            self.enqueue_command(&event);
        }

        match self.sender.send(event) {
            Ok(receivers) => {
                trace!(?topic, receivers, "Event published");
                receivers
            }
            Err(_) => {
                trace!(?topic, "Event published with no observers");
                0
            }
        }
    }

    fn enqueue_command(&self, event: &ManagementEvent) {
        let mut commands = self.commands.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = commands.as_ref() else {
            return;
        };
        if sender.send(event.clone()).is_err() {
            warn!(topic = ?event.topic(), "Command consumer gone, detaching command queue");
            *commands = None;
        }
    }

    /// Whether a command consumer is attached.
    #[must_use]
    pub fn has_command_consumer(&self) -> bool {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|sender| !sender.is_closed())
    }

    /// Number of broadcast observers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Broadcast ring capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: ManagementEvent) -> usize {
        self.publish_now(event)
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
