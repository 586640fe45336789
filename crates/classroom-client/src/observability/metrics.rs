//! Metrics definitions for the classroom client.
//!
//! All metrics follow Prometheus naming conventions:
//! - `classroom_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! - `trigger`: 6 values (bounded by `LeaveTrigger`)
//! - `timer`: 3 values (no-peers, host-left, host-absent)
//! - `outcome`: 4 values (armed, cancelled, fired, stale)
//! - `result`: 3 values (success, rejected, network)
//!
//! No exporter is installed by the library; the host application picks one.
//! With no recorder installed every call is a no-op.

use metrics::{counter, histogram};
use std::time::Duration;

/// Record that the leave sequence ran.
///
/// Metric: `classroom_leave_total`
/// Labels: `trigger`
pub fn record_leave(trigger: &str) {
    counter!("classroom_leave_total", "trigger" => trigger.to_string()).increment(1);
}

/// Record a debounce timer transition.
///
/// Metric: `classroom_debounce_timer_total`
/// Labels: `timer`, `outcome`
///
/// A high cancelled/fired ratio means the grace windows are absorbing
/// transient roster churn as intended.
pub fn record_timer(timer: &str, outcome: &str) {
    counter!(
        "classroom_debounce_timer_total",
        "timer" => timer.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a failed `leave()` call.
///
/// Metric: `classroom_leave_errors_total`
/// Labels: none
pub fn record_leave_error() {
    counter!("classroom_leave_errors_total").increment(1);
}

/// Record how long the collaborator's `leave()` took.
///
/// Metric: `classroom_leave_call_duration_seconds`
/// Labels: none
pub fn record_leave_call_duration(duration: Duration) {
    histogram!("classroom_leave_call_duration_seconds").record(duration.as_secs_f64());
}

/// Record a join attempt.
///
/// Metric: `classroom_join_attempts_total`
/// Labels: `result` (success, rejected, network)
pub fn record_join_attempt(result: &str) {
    counter!("classroom_join_attempts_total", "result" => result.to_string()).increment(1);
}
