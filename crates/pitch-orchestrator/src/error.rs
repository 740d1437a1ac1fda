//! Orchestrator error types.
//!
//! `Waiting` is deliberately absent here: it is a
//! [`DependencyStatus`](pitch_models::DependencyStatus) variant, never an error.

use pitch_models::{Branch, FailureKind, FailureRecord, FailureSource, JobId, ReportError, TransitionError};
use pitch_providers::ProviderError;
use thiserror::Error;

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("Branch failure: {0}")]
    Branch(#[from] BranchFailure),

    #[error("Analysis failure: {0}")]
    Analysis(#[from] AnalysisFailure),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    pub fn invalid_upload(msg: impl Into<String>) -> Self {
        Self::InvalidUpload(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Unrecoverable condition in one processing branch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BranchFailure {
    #[error("{branch} still waiting for its dependency after {attempts} attempts")]
    RetriesExhausted { branch: Branch, attempts: u32 },

    #[error("{branch} provider failed: {reason}")]
    Provider { branch: Branch, reason: String },

    #[error("{branch} returned an empty result")]
    EmptyResult { branch: Branch },

    #[error("{branch} result could not be windowed: {reason}")]
    Segmentation { branch: Branch, reason: String },
}

impl BranchFailure {
    pub fn branch(&self) -> Branch {
        match self {
            BranchFailure::RetriesExhausted { branch, .. }
            | BranchFailure::Provider { branch, .. }
            | BranchFailure::EmptyResult { branch }
            | BranchFailure::Segmentation { branch, .. } => *branch,
        }
    }

    /// Terminal, non-retryable message shown to the user.
    pub fn user_message(&self) -> String {
        let label = self.branch().label();
        match self {
            BranchFailure::RetriesExhausted { attempts, .. } => format!(
                "{} did not become available after {} attempts. Please restart processing from the upload.",
                label, attempts
            ),
            _ => format!(
                "{} failed. Please restart processing from the upload.",
                label
            ),
        }
    }

    pub fn to_record(&self) -> FailureRecord {
        FailureRecord::new(
            FailureSource::from(self.branch()),
            FailureKind::BranchFailure,
            self.to_string(),
            self.user_message(),
        )
    }
}

/// Terminal message for a failed analysis.
pub const ANALYSIS_UNAVAILABLE_MESSAGE: &str = "Analysis unavailable - Please restart processing to try again";

/// Failure of the multimodal analysis stage.
#[derive(Debug, Error)]
pub enum AnalysisFailure {
    #[error("Analysis provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Analysis timed out after {0} seconds")]
    TimedOut(u64),

    #[error("Analysis report failed validation: {0}")]
    InvalidReport(#[from] ReportError),

    #[error("Analysis attempted before both branches finished")]
    NotReady,

    #[error("Analysis failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<AnalysisFailure>,
    },
}

impl AnalysisFailure {
    pub fn user_message(&self) -> String {
        ANALYSIS_UNAVAILABLE_MESSAGE.to_string()
    }

    pub fn to_record(&self) -> FailureRecord {
        FailureRecord::new(
            FailureSource::Analysis,
            FailureKind::AnalysisFailure,
            self.to_string(),
            self.user_message(),
        )
    }
}
