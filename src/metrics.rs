//! Metric helpers for `oversend`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::counter;

/// Name of the counter tracking adjusted sends.
pub const ADJUSTMENTS_TOTAL: &str = "oversend_adjustments_total";
/// Name of the counter tracking replayed processing cycles.
pub const CYCLE_REPLAYS_TOTAL: &str = "oversend_cycle_replays_total";
/// Name of the counter tracking adjusted payloads that were still rejected.
pub const ADJUSTMENTS_EXHAUSTED_TOTAL: &str = "oversend_adjustments_exhausted_total";
/// Name of the counter tracking processing cycles that failed terminally.
pub const CYCLE_FAILURES_TOTAL: &str = "oversend_cycle_failures_total";
/// Name of the counter tracking processing cycles that panicked.
pub const CYCLE_PANICS_TOTAL: &str = "oversend_cycle_panics_total";

/// Where an adjustment happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    /// A send issued outside any processing cycle.
    Unscoped,
    /// A send issued by a handler of a flagged processing cycle.
    InCycle,
}

impl Scope {
    /// Label value used for the `scope` label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Scope::Unscoped => "unscoped",
            Scope::InCycle => "in_cycle",
        }
    }
}

/// Record an adjusted send.
pub fn inc_adjustments(scope: Scope) {
    #[cfg(feature = "metrics")]
    counter!(ADJUSTMENTS_TOTAL, "scope" => scope.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = scope;
}

/// Record a replayed processing cycle.
pub fn inc_cycle_replays() {
    #[cfg(feature = "metrics")]
    counter!(CYCLE_REPLAYS_TOTAL).increment(1);
}

/// Record an adjusted payload that the transport still rejected.
pub fn inc_adjustments_exhausted(scope: Scope) {
    #[cfg(feature = "metrics")]
    counter!(ADJUSTMENTS_EXHAUSTED_TOTAL, "scope" => scope.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = scope;
}

/// Record a processing cycle that failed terminally.
pub fn inc_cycle_failures() {
    #[cfg(feature = "metrics")]
    counter!(CYCLE_FAILURES_TOTAL).increment(1);
}

/// Record a processing cycle that panicked.
pub fn inc_cycle_panics() {
    #[cfg(feature = "metrics")]
    counter!(CYCLE_PANICS_TOTAL).increment(1);
}
