//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; the API binary installs the
//! Prometheus recorder.

use bookreel_models::Stage;
use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const RUNS_STARTED_TOTAL: &str = "bookreel_runs_started_total";
    pub const RUNS_COMPLETED_TOTAL: &str = "bookreel_runs_completed_total";
    pub const RUNS_FAILED_TOTAL: &str = "bookreel_runs_failed_total";
    pub const RUNS_ABANDONED_TOTAL: &str = "bookreel_runs_abandoned_total";
    pub const STAGE_DURATION_SECONDS: &str = "bookreel_stage_duration_seconds";
}

pub fn record_run_started() {
    counter!(names::RUNS_STARTED_TOTAL).increment(1);
}

pub fn record_run_completed() {
    counter!(names::RUNS_COMPLETED_TOTAL).increment(1);
}

/// Record a run that stopped at `stage`.
pub fn record_run_failed(stage: Stage, kind: &str) {
    let labels = [("stage", stage.as_str().to_string()), ("kind", kind.to_string())];
    counter!(names::RUNS_FAILED_TOTAL, &labels).increment(1);
}

pub fn record_run_abandoned() {
    counter!(names::RUNS_ABANDONED_TOTAL).increment(1);
}

/// Record how long one stage call took.
pub fn record_stage_duration(stage: Stage, outcome: &str, duration_secs: f64) {
    let labels = [
        ("stage", stage.as_str().to_string()),
        ("outcome", outcome.to_string()),
    ];
    histogram!(names::STAGE_DURATION_SECONDS, &labels).record(duration_secs);
}
