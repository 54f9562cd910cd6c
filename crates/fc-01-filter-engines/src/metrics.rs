//! Traffic counters for engine searches
//!
//! Each engine generator owns one [`TrafficMetrics`]. The stat ticker takes
//! a window at every interval, which reads and resets the counters.
//!
//! ## Usage
//!
//! ```ignore
//! use fc_01_filter_engines::metrics::TrafficMetrics;
//!
//! let metrics = TrafficMetrics::new();
//! let start = std::time::Instant::now();
//! let uris = engine.search(id);
//! metrics.record_search(start.elapsed(), !uris.is_empty());
//!
//! let window = metrics.take_window();
//! println!("{} us/event", window.micros_per_event());
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Thread-safe search counters
#[derive(Debug, Default)]
pub struct TrafficMetrics {
    /// Identifiers searched
    pub events: AtomicU64,
    /// Searches that reported at least one URI
    pub matched: AtomicU64,
    /// Cumulative search time in nanoseconds
    pub search_time_ns: AtomicU64,
}

impl TrafficMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_search(&self, duration: Duration, matched: bool) {
        self.events.fetch_add(1, Ordering::Relaxed);
        self.search_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
        if matched {
            self.matched.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Current counters without resetting them
    pub fn snapshot(&self) -> TrafficSnapshot {
        TrafficSnapshot {
            events: self.events.load(Ordering::Relaxed),
            matched: self.matched.load(Ordering::Relaxed),
            search_time_ns: self.search_time_ns.load(Ordering::Relaxed),
        }
    }

    /// Read and reset the counters
    pub fn take_window(&self) -> TrafficSnapshot {
        TrafficSnapshot {
            events: self.events.swap(0, Ordering::Relaxed),
            matched: self.matched.swap(0, Ordering::Relaxed),
            search_time_ns: self.search_time_ns.swap(0, Ordering::Relaxed),
        }
    }
}

/// Counters for one reporting window
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrafficSnapshot {
    pub events: u64,
    pub matched: u64,
    pub search_time_ns: u64,
}

impl TrafficSnapshot {
    /// Average search time, `None` if nothing was searched
    pub fn micros_per_event(&self) -> Option<f64> {
        if self.events == 0 {
            return None;
        }
        Some(self.search_time_ns as f64 / 1000.0 / self.events as f64)
    }

    pub fn match_rate(&self) -> f64 {
        if self.events == 0 {
            0.0
        } else {
            self.matched as f64 / self.events as f64
        }
    }
}
