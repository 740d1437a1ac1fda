//! Orchestrator metrics.
//!
//! Recorded through the `metrics` facade; the API binary installs the
//! Prometheus recorder. Without a recorder these calls are no-ops.

use metrics::{counter, histogram};
use pitch_models::Branch;

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_SUBMITTED_TOTAL: &str = "pitch_jobs_submitted_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "pitch_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "pitch_jobs_failed_total";

    pub const BRANCH_WAITING_TOTAL: &str = "pitch_branch_waiting_total";
    pub const BRANCH_FAILURES_TOTAL: &str = "pitch_branch_failures_total";
    pub const BRANCH_DURATION_SECONDS: &str = "pitch_branch_duration_seconds";

    pub const ANALYSIS_RETRIES_TOTAL: &str = "pitch_analysis_retries_total";
    pub const ANALYSIS_DURATION_SECONDS: &str = "pitch_analysis_duration_seconds";
}

pub fn record_job_submitted() {
    counter!(names::JOBS_SUBMITTED_TOTAL).increment(1);
}

pub fn record_job_completed() {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
}

/// `source` is the failure source label (`transcription`, `analysis`, ...).
pub fn record_job_failed(source: &str) {
    let labels = [("source", source.to_string())];
    counter!(names::JOBS_FAILED_TOTAL, &labels).increment(1);
}

pub fn record_branch_waiting(branch: Branch) {
    let labels = [("branch", branch.as_str().to_string())];
    counter!(names::BRANCH_WAITING_TOTAL, &labels).increment(1);
}

pub fn record_branch_failure(branch: Branch) {
    let labels = [("branch", branch.as_str().to_string())];
    counter!(names::BRANCH_FAILURES_TOTAL, &labels).increment(1);
}

pub fn record_branch_duration(branch: Branch, duration_secs: f64) {
    let labels = [("branch", branch.as_str().to_string())];
    histogram!(names::BRANCH_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_analysis_retry() {
    counter!(names::ANALYSIS_RETRIES_TOTAL).increment(1);
}

pub fn record_analysis_duration(duration_secs: f64) {
    histogram!(names::ANALYSIS_DURATION_SECONDS).record(duration_secs);
}
