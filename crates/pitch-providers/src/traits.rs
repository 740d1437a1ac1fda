//! Collaborator boundaries used by the orchestrator.

use async_trait::async_trait;
use pitch_models::{AnalysisRequest, AudioRef, DependencyStatus, FrameSet, RawAnalysisReport, Transcript, VideoRef};

use crate::error::ProviderResult;

/// Samples still frames from an uploaded video.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// One attempt. `Waiting` means the video is not processable yet.
    async fn extract_frames(&self, video: &VideoRef) -> DependencyStatus<FrameSet>;
}

/// Converts the audio rendition of a video into timed text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// One attempt. `Waiting` means the audio rendition does not exist yet.
    async fn transcribe(&self, audio: &AudioRef) -> DependencyStatus<Transcript>;
}

/// Scores aligned frames and transcript windows.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Returns the unvalidated report; schema checks happen downstream.
    async fn analyze(&self, request: &AnalysisRequest) -> ProviderResult<RawAnalysisReport>;
}
