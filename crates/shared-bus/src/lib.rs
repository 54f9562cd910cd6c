//! # Shared Bus - Management Event Bus
//!
//! In-process channel between the parts of the filtering middleware that
//! must not call each other directly: the subscription management surface,
//! the engine generators, and the coordinator that picks the engine serving
//! traffic.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │  Generator   │                    │ Coordinator  │
//! │              │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! Observers share a bounded ring: one that lags behind the capacity loses
//! the oldest events. Commands (subscription changes, build announcements,
//! throughput reports) are also queued for the single coordination loop on
//! an unbounded channel and are never dropped.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventFilter, EventTopic, ManagementEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{CommandStream, Subscription, SubscriptionError};

/// Broadcast ring size; observers further behind lose the oldest events.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
