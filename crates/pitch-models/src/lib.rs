//! Shared data models for the pitch-perfect processing backend.
//!
//! This crate provides Serde-serializable types for:
//! - Processing jobs, their stages and branch states
//! - Collaborator status values (`Ready` / `Waiting` / `Failed`)
//! - Extracted frames, transcript segments and transcript windows
//! - Multimodal analysis reports and their validation
//! - Job events published to observers

pub mod event;
pub mod job;
pub mod media;
pub mod report;
pub mod status;
pub mod timestamp;

// Re-export common types
pub use event::JobEvent;
pub use job::{
    AnalysisProgress, AnalysisStage, AudioRef, Branch, BranchProgress, BranchState, FailureKind,
    FailureRecord, FailureSource, JobId, JobStage, ProcessingJob, TransitionError, VideoRef,
};
pub use media::{AlignedFrame, AnalysisRequest, Frame, FrameSet, Transcript, TranscriptSegment, TranscriptWindow};
pub use report::{
    AnalysisIssue, AnalysisReport, IssueTimestamp, RawAnalysisReport, RawIssue, ReportError,
    ScoreCategory, MAX_SCORE,
};
pub use status::DependencyStatus;
