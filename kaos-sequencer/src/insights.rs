//! Insights - Observability for kaos-sequencer.
//!
//! Spans on cold paths only (backpressure, alerts, forced publishes).
//! Zero-cost when disabled.
//!
//! # Usage
//!
//! ## Basic tracing (console output)
//! ```toml
//! kaos-sequencer = { version = "0.1", features = ["tracing"] }
//! ```
//! ```rust,ignore
//! tracing_subscriber::fmt::init();
//! ```
//!
//! ## Tracy profiler (real-time visualization)
//! ```toml
//! kaos-sequencer = { version = "0.1", features = ["tracy"] }
//! ```
//! ```rust,ignore
//! kaos_sequencer::init_tracy();
//! ```

/// Initialize Tracy profiler (call once at startup)
#[cfg(feature = "tracy")]
pub fn init_tracy() {
    use tracing_subscriber::layer::SubscriberExt;
    tracing::subscriber::set_global_default(
        tracing_subscriber::registry().with(tracing_tracy::TracyLayer::default()),
    )
    .expect("setup tracy layer");
}

#[cfg(not(feature = "tracy"))]
pub fn init_tracy() {}

/// Record a producer stalled on a full ring
#[cfg(feature = "tracing")]
#[inline]
pub fn record_backpressure(sequence: i64, min_gating: i64) {
    let _span = tracing::warn_span!("backpressure", sequence, min_gating).entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_backpressure(_sequence: i64, _min_gating: i64) {}

/// Record a barrier alert
#[cfg(feature = "tracing")]
#[inline]
pub fn record_alert(cursor: i64) {
    let _span = tracing::debug_span!("alert", cursor).entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_alert(_cursor: i64) {}

/// Record a cursor restored through `force_publish`
#[cfg(feature = "tracing")]
#[inline]
pub fn record_forced_publish(sequence: i64) {
    tracing::info!(sequence, "cursor force published");
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_forced_publish(_sequence: i64) {}
