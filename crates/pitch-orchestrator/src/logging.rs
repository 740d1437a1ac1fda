//! Structured job logging utilities.
//!
//! Every line carries `job_id` and `operation`; waiting notices carry
//! `status = "waiting_for_dependency"` so they can be filtered apart from
//! failures.

use pitch_models::{Branch, JobId};
use tracing::{error, info, warn, Span};

/// Job logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: String,
}

impl JobLogger {
    pub fn new(job_id: &JobId, operation: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Logger for the same job under another operation name.
    pub fn for_operation(&self, operation: &str) -> Self {
        Self {
            job_id: self.job_id.clone(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job progress: {}", message
        );
    }

    /// Upstream dependency not ready. Not an error.
    pub fn log_waiting(&self, branch: Branch, retry_count: u32, max_retries: u32, retry_in_secs: u64) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            branch = branch.as_str(),
            status = "waiting_for_dependency",
            retry_count,
            max_retries,
            retry_in_secs,
            "Status: waiting_for_dependency"
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job warning: {}", message
        );
    }

    /// Terminal failure of a branch or of analysis.
    pub fn log_failure(&self, source: &str, message: &str) {
        error!(
            job_id = %self.job_id,
            operation = %self.operation,
            source,
            "Job failed: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job completed: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Create a tracing span for this job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            operation = %self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_logger_creation() {
        let job_id = JobId::new();
        let logger = JobLogger::new(&job_id, "processing");

        assert_eq!(logger.job_id(), job_id.to_string());
        assert_eq!(logger.operation(), "processing");
        assert_eq!(logger.for_operation("analysis").operation(), "analysis");
        assert_eq!(logger.for_operation("analysis").job_id(), job_id.as_str());
    }
}
