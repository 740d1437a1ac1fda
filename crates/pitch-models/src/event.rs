//! Job events published to observers.
//!
//! Every state change of a job produces one event on the job's broadcast
//! channel. Subscribers render waiting notices, countdowns and analysis
//! progress from these without polling.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::job::{AnalysisStage, Branch, JobId, JobStage};

/// Job event envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    /// Job moved to a new stage
    StageChanged {
        job_id: JobId,
        from: JobStage,
        to: JobStage,
        timestamp: DateTime<Utc>,
    },

    /// Upstream dependency not ready; a retry is scheduled
    BranchWaiting {
        job_id: JobId,
        branch: Branch,
        retry_count: u32,
        max_retries: u32,
        retry_in_secs: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        estimated_seconds: Option<u64>,
        message: String,
    },

    /// One tick of the retry countdown
    RetryCountdown {
        job_id: JobId,
        branch: Branch,
        seconds_remaining: u64,
    },

    /// Retry attempt in flight
    BranchRetrying {
        job_id: JobId,
        branch: Branch,
        retry_count: u32,
    },

    /// Branch produced its result
    BranchCompleted {
        job_id: JobId,
        branch: Branch,
        /// Frames or transcript segments produced
        items: usize,
    },

    /// Branch failed terminally
    BranchFailed {
        job_id: JobId,
        branch: Branch,
        message: String,
    },

    /// Analysis entered a new step
    AnalysisProgress {
        job_id: JobId,
        stage: AnalysisStage,
        percent: u8,
        message: String,
        attempt: u32,
    },

    /// First analysis attempt failed; the automatic retry is scheduled
    AnalysisRetrying {
        job_id: JobId,
        attempt: u32,
        reason: String,
    },

    /// Analysis report available
    Completed { job_id: JobId, summary: String },

    /// Job failed; restart is the only recovery
    Failed { job_id: JobId, message: String },
}

impl JobEvent {
    pub fn job_id(&self) -> &JobId {
        match self {
            JobEvent::StageChanged { job_id, .. }
            | JobEvent::BranchWaiting { job_id, .. }
            | JobEvent::RetryCountdown { job_id, .. }
            | JobEvent::BranchRetrying { job_id, .. }
            | JobEvent::BranchCompleted { job_id, .. }
            | JobEvent::BranchFailed { job_id, .. }
            | JobEvent::AnalysisProgress { job_id, .. }
            | JobEvent::AnalysisRetrying { job_id, .. }
            | JobEvent::Completed { job_id, .. }
            | JobEvent::Failed { job_id, .. } => job_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            JobEvent::StageChanged { .. } => "stage_changed",
            JobEvent::BranchWaiting { .. } => "branch_waiting",
            JobEvent::RetryCountdown { .. } => "retry_countdown",
            JobEvent::BranchRetrying { .. } => "branch_retrying",
            JobEvent::BranchCompleted { .. } => "branch_completed",
            JobEvent::BranchFailed { .. } => "branch_failed",
            JobEvent::AnalysisProgress { .. } => "analysis_progress",
            JobEvent::AnalysisRetrying { .. } => "analysis_retrying",
            JobEvent::Completed { .. } => "completed",
            JobEvent::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobEvent::Completed { .. } | JobEvent::Failed { .. })
    }
}
