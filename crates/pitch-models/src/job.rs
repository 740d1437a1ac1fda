//! Processing job record and its state machine.
//!
//! A [`ProcessingJob`] is created when an upload is accepted and is mutated
//! only through the transition methods below. Stage changes follow a fixed
//! transition table; the two processing branches carry their own table,
//! which is the only place a cycle (`waiting_for_dependency -> retrying ->
//! waiting_for_dependency`) is allowed.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::media::{Frame, TranscriptSegment, TranscriptWindow};
use crate::report::AnalysisReport;

/// Unique identifier for a processing job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle to uploaded media that is already durably stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoRef(pub String);

impl VideoRef {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the reference carries no usable handle.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for VideoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to the audio-only rendition of an uploaded video.
///
/// The extraction service addresses the audio rendition by the same asset
/// handle as the video; the rendition itself materializes asynchronously.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct AudioRef(pub String);

impl AudioRef {
    pub fn for_video(video: &VideoRef) -> Self {
        Self(video.0.clone())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Overall job stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    /// Record exists but no upload has been accepted yet
    #[default]
    Idle,
    /// Upload accepted, branches not started
    Uploading,
    /// Frame extraction and transcription running in parallel
    Processing,
    /// Multimodal analysis running
    Analyzing,
    /// Analysis report available
    Complete,
    /// Terminal failure; the caller must restart the job
    Failed,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Idle => "idle",
            JobStage::Uploading => "uploading",
            JobStage::Processing => "processing",
            JobStage::Analyzing => "analyzing",
            JobStage::Complete => "complete",
            JobStage::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStage::Complete | JobStage::Failed)
    }

    /// Transition table for the job stage.
    pub fn can_transition_to(&self, next: JobStage) -> bool {
        use JobStage::*;
        matches!(
            (self, next),
            (Idle, Uploading)
                | (Uploading, Processing)
                | (Uploading, Failed)
                | (Processing, Analyzing)
                | (Processing, Failed)
                | (Analyzing, Complete)
                | (Analyzing, Failed)
        )
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One of the two independently progressing processing paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    FrameExtraction,
    Transcription,
}

impl Branch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Branch::FrameExtraction => "frame_extraction",
            Branch::Transcription => "transcription",
        }
    }

    /// Human-readable label used in terminal messages.
    pub fn label(&self) -> &'static str {
        match self {
            Branch::FrameExtraction => "Frame extraction",
            Branch::Transcription => "Transcription",
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Branch-local state inside the `processing` stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum BranchState {
    #[default]
    Pending,
    /// Upstream artifact not materialized yet; a retry is scheduled
    WaitingForDependency,
    /// Retry delay elapsed, attempt in flight
    Retrying,
    Done,
    Failed,
}

impl BranchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BranchState::Pending => "pending",
            BranchState::WaitingForDependency => "waiting_for_dependency",
            BranchState::Retrying => "retrying",
            BranchState::Done => "done",
            BranchState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BranchState::Done | BranchState::Failed)
    }

    /// Transition table for a single branch.
    pub fn can_transition_to(&self, next: BranchState) -> bool {
        use BranchState::*;
        matches!(
            (self, next),
            (Pending, WaitingForDependency)
                | (Pending, Done)
                | (Pending, Failed)
                | (WaitingForDependency, Retrying)
                | (WaitingForDependency, Failed)
                | (Retrying, WaitingForDependency)
                | (Retrying, Done)
                | (Retrying, Failed)
        )
    }
}

impl fmt::Display for BranchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Observable progress of one branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct BranchProgress {
    pub state: BranchState,
    /// Number of `Waiting` responses received so far
    pub retry_count: u32,
    /// Live countdown until the next retry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_in_secs: Option<u64>,
    /// Provider's estimate of when the dependency will be ready
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl BranchProgress {
    pub fn is_done(&self) -> bool {
        self.state == BranchState::Done
    }

    /// True while the branch is cycling through waiting/retrying.
    pub fn is_waiting(&self) -> bool {
        matches!(
            self.state,
            BranchState::WaitingForDependency | BranchState::Retrying
        )
    }
}

/// The four sequential steps of multimodal analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    PreparePayload,
    Dispatch,
    AwaitResponse,
    Validate,
}

impl AnalysisStage {
    pub const ALL: [AnalysisStage; 4] = [
        AnalysisStage::PreparePayload,
        AnalysisStage::Dispatch,
        AnalysisStage::AwaitResponse,
        AnalysisStage::Validate,
    ];

    /// 1-based step number.
    pub fn number(&self) -> u8 {
        match self {
            AnalysisStage::PreparePayload => 1,
            AnalysisStage::Dispatch => 2,
            AnalysisStage::AwaitResponse => 3,
            AnalysisStage::Validate => 4,
        }
    }

    /// Progress checkpoint reached when this step is entered.
    pub fn percent(&self) -> u8 {
        self.number() * 25
    }

    pub fn message(&self) -> &'static str {
        match self {
            AnalysisStage::PreparePayload => "Aligning frames with transcript segments...",
            AnalysisStage::Dispatch => "Analyzing visual-verbal alignment...",
            AnalysisStage::AwaitResponse => "Processing framework scores...",
            AnalysisStage::Validate => "Generating recommendations...",
        }
    }
}

/// Snapshot of the analysis step currently running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisProgress {
    pub stage: AnalysisStage,
    pub percent: u8,
    pub message: String,
    /// 1 for the first attempt, 2 for the automatic retry
    pub attempt: u32,
}

impl AnalysisProgress {
    pub fn new(stage: AnalysisStage, attempt: u32) -> Self {
        Self {
            stage,
            percent: stage.percent(),
            message: stage.message().to_string(),
            attempt,
        }
    }
}

/// Where a terminal failure originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureSource {
    FrameExtraction,
    Transcription,
    Analysis,
}

impl FailureSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureSource::FrameExtraction => "frame_extraction",
            FailureSource::Transcription => "transcription",
            FailureSource::Analysis => "analysis",
        }
    }
}

impl From<Branch> for FailureSource {
    fn from(branch: Branch) -> Self {
        match branch {
            Branch::FrameExtraction => FailureSource::FrameExtraction,
            Branch::Transcription => FailureSource::Transcription,
        }
    }
}

/// Category of a terminal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    BranchFailure,
    AnalysisFailure,
}

/// One unrecoverable condition recorded on a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FailureRecord {
    pub source: FailureSource,
    pub kind: FailureKind,
    /// Technical detail for logs and support
    pub detail: String,
    /// User-facing, non-retryable message
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

impl FailureRecord {
    pub fn new(
        source: FailureSource,
        kind: FailureKind,
        detail: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            kind,
            detail: detail.into(),
            message: message.into(),
            occurred_at: Utc::now(),
        }
    }
}

/// Rejected state change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Invalid job transition: {from} -> {to}")]
    Job { from: JobStage, to: JobStage },

    #[error("Invalid {branch} transition: {from} -> {to}")]
    Branch {
        branch: Branch,
        from: BranchState,
        to: BranchState,
    },
}

/// One processing job per uploaded video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProcessingJob {
    pub job_id: JobId,
    pub video_ref: VideoRef,
    pub stage: JobStage,

    /// Frame extraction branch
    pub frames: BranchProgress,
    /// Transcription branch
    pub transcript: BranchProgress,

    /// Extracted frames, ordered by timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_extraction_result: Option<Vec<Frame>>,

    /// Provider transcript segments, in provider order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript_segments: Option<Vec<TranscriptSegment>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript_text: Option<String>,

    /// Fixed-duration view of the transcript used for frame alignment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript_windows: Option<Vec<TranscriptWindow>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisProgress>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_result: Option<AnalysisReport>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_started_at: Option<DateTime<Utc>>,

    /// Terminal failures only; waiting never lands here
    #[serde(default)]
    pub errors: Vec<FailureRecord>,

    /// Single terminal message instructing a restart
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_message: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProcessingJob {
    /// Create a new job record in `idle`.
    pub fn new(video_ref: VideoRef) -> Self {
        let now = Utc::now();
        Self {
            job_id: JobId::new(),
            video_ref,
            stage: JobStage::Idle,
            frames: BranchProgress::default(),
            transcript: BranchProgress::default(),
            frame_extraction_result: None,
            transcript_segments: None,
            transcript_text: None,
            transcript_windows: None,
            analysis: None,
            analysis_result: None,
            analysis_started_at: None,
            errors: Vec::new(),
            terminal_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn branch(&self, branch: Branch) -> &BranchProgress {
        match branch {
            Branch::FrameExtraction => &self.frames,
            Branch::Transcription => &self.transcript,
        }
    }

    pub fn branch_mut(&mut self, branch: Branch) -> &mut BranchProgress {
        match branch {
            Branch::FrameExtraction => &mut self.frames,
            Branch::Transcription => &mut self.transcript,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Bump the updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Move the job to `next`, enforcing the stage transition table.
    pub fn transition_to(&mut self, next: JobStage) -> Result<(), TransitionError> {
        if !self.stage.can_transition_to(next) {
            return Err(TransitionError::Job {
                from: self.stage,
                to: next,
            });
        }
        self.stage = next;
        self.touch();
        Ok(())
    }

    /// Move one branch to `next`, enforcing the branch transition table.
    pub fn set_branch_state(&mut self, branch: Branch, next: BranchState) -> Result<(), TransitionError> {
        let progress = self.branch_mut(branch);
        if !progress.state.can_transition_to(next) {
            return Err(TransitionError::Branch {
                branch,
                from: progress.state,
                to: next,
            });
        }
        progress.state = next;
        if next.is_terminal() {
            progress.retry_in_secs = None;
        }
        if next == BranchState::Done {
            progress.completed_at = Some(Utc::now());
        }
        self.touch();
        Ok(())
    }

    pub fn both_branches_done(&self) -> bool {
        self.frames.is_done() && self.transcript.is_done()
    }

    /// Join condition for `processing -> analyzing`.
    pub fn ready_for_analysis(&self) -> bool {
        self.stage == JobStage::Processing
            && self.both_branches_done()
            && self
                .frame_extraction_result
                .as_ref()
                .is_some_and(|frames| !frames.is_empty())
            && self
                .transcript_segments
                .as_ref()
                .is_some_and(|segments| !segments.is_empty())
    }

    /// Latch the job into `failed` with a terminal record.
    pub fn fail(&mut self, record: FailureRecord) -> Result<(), TransitionError> {
        self.transition_to(JobStage::Failed)?;
        self.terminal_message = Some(record.message.clone());
        self.errors.push(record);
        Ok(())
    }

    /// Store the analysis report and finish the job.
    pub fn complete(&mut self, report: AnalysisReport) -> Result<(), TransitionError> {
        self.transition_to(JobStage::Complete)?;
        self.analysis_result = Some(report);
        Ok(())
    }

    /// Structured status discriminator for pollers.
    ///
    /// Reports `waiting_for_dependency` while either branch is waiting on an
    /// upstream artifact, otherwise the job stage.
    pub fn status_label(&self) -> &'static str {
        if self.stage == JobStage::Processing && (self.frames.is_waiting() || self.transcript.is_waiting()) {
            BranchState::WaitingForDependency.as_str()
        } else {
            self.stage.as_str()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ScoreCategory;
    use std::collections::BTreeMap;

    fn job_in_processing() -> ProcessingJob {
        let mut job = ProcessingJob::new(VideoRef::new("asset-1"));
        job.transition_to(JobStage::Uploading).unwrap();
        job.transition_to(JobStage::Processing).unwrap();
        job
    }

    fn sample_report() -> AnalysisReport {
        let category_scores: BTreeMap<_, _> = ScoreCategory::ALL.iter().map(|c| (*c, 7.0)).collect();
        AnalysisReport {
            overall_score: 7.2,
            category_scores,
            issues: Vec::new(),
        }
    }

    #[test]
    fn test_job_creation() {
        let job = ProcessingJob::new(VideoRef::new("asset-1"));
        assert_eq!(job.stage, JobStage::Idle);
        assert_eq!(job.frames.state, BranchState::Pending);
        assert_eq!(job.transcript.state, BranchState::Pending);
        assert!(job.errors.is_empty());
        assert!(!job.is_terminal());
    }

    #[test]
    fn test_stage_transitions_are_monotonic() {
        let mut job = job_in_processing();
        assert!(job.transition_to(JobStage::Uploading).is_err());
        assert!(job.transition_to(JobStage::Complete).is_err());

        job.transition_to(JobStage::Analyzing).unwrap();
        assert!(job.transition_to(JobStage::Processing).is_err());

        job.complete(sample_report()).unwrap();
        assert_eq!(job.stage, JobStage::Complete);
        assert!(job.transition_to(JobStage::Failed).is_err());
    }

    #[test]
    fn test_branch_waiting_cycle() {
        let mut job = job_in_processing();
        let b = Branch::Transcription;

        job.set_branch_state(b, BranchState::WaitingForDependency).unwrap();
        job.set_branch_state(b, BranchState::Retrying).unwrap();
        job.set_branch_state(b, BranchState::WaitingForDependency).unwrap();
        job.set_branch_state(b, BranchState::Retrying).unwrap();
        job.set_branch_state(b, BranchState::Done).unwrap();

        assert!(job.transcript.completed_at.is_some());
        let err = job.set_branch_state(b, BranchState::Retrying).unwrap_err();
        assert!(matches!(err, TransitionError::Branch { .. }));
    }

    #[test]
    fn test_waiting_cannot_jump_to_done() {
        let mut job = job_in_processing();
        job.set_branch_state(Branch::FrameExtraction, BranchState::WaitingForDependency)
            .unwrap();
        assert!(job
            .set_branch_state(Branch::FrameExtraction, BranchState::Done)
            .is_err());
    }

    #[test]
    fn test_ready_for_analysis_requires_both_branches_and_payloads() {
        let mut job = job_in_processing();
        job.set_branch_state(Branch::FrameExtraction, BranchState::Done).unwrap();
        job.frame_extraction_result = Some(vec![Frame::new("f1", 5.0)]);
        assert!(!job.ready_for_analysis());

        job.set_branch_state(Branch::Transcription, BranchState::Done).unwrap();
        job.transcript_segments = Some(Vec::new());
        assert!(!job.ready_for_analysis());

        job.transcript_segments = Some(vec![TranscriptSegment::new("hello", 0.0, 5.0, 0.9)]);
        assert!(job.ready_for_analysis());

        job.transition_to(JobStage::Analyzing).unwrap();
        assert!(!job.ready_for_analysis());
    }

    #[test]
    fn test_fail_records_single_terminal_message() {
        let mut job = job_in_processing();
        let record = FailureRecord::new(
            FailureSource::Transcription,
            FailureKind::BranchFailure,
            "retries exhausted",
            "Please restart processing.",
        );
        job.fail(record).unwrap();

        assert_eq!(job.stage, JobStage::Failed);
        assert_eq!(job.errors.len(), 1);
        assert_eq!(job.terminal_message.as_deref(), Some("Please restart processing."));
    }

    #[test]
    fn test_status_label_reports_waiting() {
        let mut job = job_in_processing();
        assert_eq!(job.status_label(), "processing");

        job.set_branch_state(Branch::Transcription, BranchState::WaitingForDependency)
            .unwrap();
        assert_eq!(job.status_label(), "waiting_for_dependency");

        job.set_branch_state(Branch::Transcription, BranchState::Retrying).unwrap();
        assert_eq!(job.status_label(), "waiting_for_dependency");
    }

    #[test]
    fn test_analysis_stage_checkpoints() {
        let percents: Vec<u8> = AnalysisStage::ALL.iter().map(|s| s.percent()).collect();
        assert_eq!(percents, vec![25, 50, 75, 100]);
    }

    #[test]
    fn test_job_serializes_snake_case_states() {
        let mut job = job_in_processing();
        job.set_branch_state(Branch::Transcription, BranchState::WaitingForDependency)
            .unwrap();
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["stage"], "processing");
        assert_eq!(value["transcript"]["state"], "waiting_for_dependency");
    }
}
