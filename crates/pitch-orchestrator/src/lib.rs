//! Dependency-aware processing orchestrator.
//!
//! Coordinates upload -> parallel {frame extraction, transcription} ->
//! multimodal analysis for each uploaded presentation video:
//!
//! - each job is owned by a single driver task that applies
//!   branch updates in order, so the readiness join is race-free
//! - each branch runs in its own task ([`branch`]) and retries while its
//!   upstream artifact is `Waiting`, with a configurable backoff ([`retry`])
//! - analysis runs in four stages with one automatic retry ([`analysis`])
//! - frames are paired with fixed transcript windows ([`alignment`])

pub mod alignment;
pub mod analysis;
pub mod branch;
pub mod config;
mod driver;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod retry;

pub use alignment::{align_frames, build_windows, check_transcript_span};
pub use analysis::{AnalysisObserver, AnalysisRunner};
pub use branch::{attempt_frame_extraction, attempt_transcription, BranchMessage, BranchRunner, BranchUpdate};
pub use config::OrchestratorConfig;
pub use error::{
    AnalysisFailure, BranchFailure, OrchestratorError, OrchestratorResult, ANALYSIS_UNAVAILABLE_MESSAGE,
};
pub use logging::JobLogger;
pub use orchestrator::{Orchestrator, Providers};
pub use retry::{
    retry_async, retry_async_notify, BackoffKind, BackoffPolicy, ExponentialBackoff, FixedBackoff,
    LinearBackoff, RetryConfig, RetryResult,
};
