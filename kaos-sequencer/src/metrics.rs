//! Metrics for kaos sequencers.
//!
//! Lightweight counters for cold-path events. The claim and publish hot paths
//! are never counted.

use std::sync::atomic::{ AtomicU64, Ordering };

/// Per-sequencer event counters
pub struct Metrics {
    pub backpressure_events: AtomicU64,
    pub capacity_rejections: AtomicU64,
    pub forced_publishes: AtomicU64,
    pub alerts: AtomicU64,
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            backpressure_events: AtomicU64::new(0),
            capacity_rejections: AtomicU64::new(0),
            forced_publishes: AtomicU64::new(0),
            alerts: AtomicU64::new(0),
        }
    }

    /// A blocking claim had to wait for consumers
    #[inline]
    pub fn record_backpressure(&self) {
        self.backpressure_events.fetch_add(1, Ordering::Relaxed);
    }

    /// A non-blocking claim was refused
    #[inline]
    pub fn record_capacity_rejection(&self) {
        self.capacity_rejections.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_forced_publish(&self) {
        self.forced_publishes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_alert(&self) {
        self.alerts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            backpressure_events: self.backpressure_events.load(Ordering::Relaxed),
            capacity_rejections: self.capacity_rejections.load(Ordering::Relaxed),
            forced_publishes: self.forced_publishes.load(Ordering::Relaxed),
            alerts: self.alerts.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.backpressure_events.store(0, Ordering::Relaxed);
        self.capacity_rejections.store(0, Ordering::Relaxed);
        self.forced_publishes.store(0, Ordering::Relaxed);
        self.alerts.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.snapshot().fmt(f)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub backpressure_events: u64,
    pub capacity_rejections: u64,
    pub forced_publishes: u64,
    pub alerts: u64,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "backpressure={} rejected={} forced={} alerts={}",
            self.backpressure_events,
            self.capacity_rejections,
            self.forced_publishes,
            self.alerts
        )
    }
}
