//! Tick timing and overrun accounting.
//!
//! Components report how long each tick took to an injected
//! [`TickObserver`]. [`TickStats`] is the stock accumulating observer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tracing::trace;

/// Receives per-tick timing from a component.
pub trait TickObserver {
    /// Called after every tick with the time spent evaluating and applying.
    fn on_tick(&self, component: &str, busy: Duration);

    /// Called when a tick took longer than the component's period.
    fn on_overrun(&self, component: &str, busy: Duration, period: Duration) {
        let _ = (component, busy, period);
    }
}

/// A simple timer that measures elapsed wall time.
pub struct Timer {
    label: &'static str,
    start: Instant,
}

impl Timer {
    /// Create and start a new timer with the given label.
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
        }
    }

    /// Stop the timer and return the elapsed time.
    pub fn stop(self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and emit the elapsed time as a trace event.
    pub fn stop_and_trace(self) -> Duration {
        let label = self.label;
        let elapsed = self.stop();
        trace!(label, elapsed_us = elapsed.as_micros() as u64, "timer");
        elapsed
    }
}

/// Accumulating tick statistics.
pub struct TickStats {
    total_ns: AtomicU64,
    max_ns: AtomicU64,
    count: AtomicU64,
    overruns: AtomicU64,
}

impl Default for TickStats {
    fn default() -> Self {
        Self::new()
    }
}

impl TickStats {
    pub const fn new() -> Self {
        Self {
            total_ns: AtomicU64::new(0),
            max_ns: AtomicU64::new(0),
            count: AtomicU64::new(0),
            overruns: AtomicU64::new(0),
        }
    }

    /// Record one tick.
    pub fn record(&self, busy: Duration) {
        let nanos = u64::try_from(busy.as_nanos()).unwrap_or(u64::MAX);
        self.total_ns.fetch_add(nanos, Ordering::Relaxed);
        self.max_ns.fetch_max(nanos, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of ticks recorded.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Number of ticks that exceeded their period.
    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }

    /// Total busy time.
    pub fn total(&self) -> Duration {
        Duration::from_nanos(self.total_ns.load(Ordering::Relaxed))
    }

    /// Longest single tick.
    pub fn max(&self) -> Duration {
        Duration::from_nanos(self.max_ns.load(Ordering::Relaxed))
    }

    /// Average busy time per tick.
    pub fn average(&self) -> Duration {
        let count = self.count();
        if count > 0 {
            Duration::from_nanos(self.total_ns.load(Ordering::Relaxed) / count)
        } else {
            Duration::ZERO
        }
    }

    pub fn reset(&self) {
        self.total_ns.store(0, Ordering::Relaxed);
        self.max_ns.store(0, Ordering::Relaxed);
        self.count.store(0, Ordering::Relaxed);
        self.overruns.store(0, Ordering::Relaxed);
    }
}

impl TickObserver for TickStats {
    fn on_tick(&self, _component: &str, busy: Duration) {
        self.record(busy);
    }

    fn on_overrun(&self, _component: &str, _busy: Duration, _period: Duration) {
        self.overruns.fetch_add(1, Ordering::Relaxed);
    }
}
