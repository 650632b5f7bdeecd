//! # Internal Metrics Module
//!
//! Herald reports through the `metrics` facade and installs no recorder of
//! its own; the embedding application chooses the exporter.
//!
//! - `herald_notifications_total{outcome}`: dispatch calls by tri-state outcome.
//! - `herald_target_failures_total{service}`: per-target failures, faults included.
//! - `herald_dispatch_duration_seconds`: wall time of a whole dispatch.

use crate::dispatch::Outcome;
use metrics::Unit;
use std::time::Duration;

pub const NOTIFICATIONS_TOTAL: &str = "herald_notifications_total";
pub const TARGET_FAILURES_TOTAL: &str = "herald_target_failures_total";
pub const DISPATCH_DURATION_SECONDS: &str = "herald_dispatch_duration_seconds";

/// Registers descriptions for every metric with the installed recorder.
pub fn describe() {
    metrics::describe_counter!(
        NOTIFICATIONS_TOTAL,
        Unit::Count,
        "Total number of dispatch calls, labeled by their outcome."
    );
    metrics::describe_counter!(
        TARGET_FAILURES_TOTAL,
        Unit::Count,
        "Total number of targets that failed to accept a notification, labeled by service."
    );
    metrics::describe_histogram!(
        DISPATCH_DURATION_SECONDS,
        Unit::Seconds,
        "The time taken to fan a notification out to every matched target."
    );
}

/// Records the outcome and duration of one dispatch call.
pub fn record_dispatch(outcome: Outcome, elapsed: Duration) {
    metrics::counter!(NOTIFICATIONS_TOTAL, "outcome" => outcome.as_str()).increment(1);
    metrics::histogram!(DISPATCH_DURATION_SECONDS).record(elapsed.as_secs_f64());
}

/// Increments the failure counter for a target's service.
pub fn increment_target_failure(service: &str) {
    metrics::counter!(TARGET_FAILURES_TOTAL, "service" => service.to_string()).increment(1);
}
