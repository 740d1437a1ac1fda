//! Scripted collaborator fakes shared by the orchestrator tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pitch_models::{
    AnalysisRequest, AudioRef, DependencyStatus, Frame, FrameSet, JobEvent, RawAnalysisReport, Transcript,
    TranscriptSegment, VideoRef,
};
use pitch_orchestrator::{Orchestrator, OrchestratorConfig, Providers, RetryConfig};
use pitch_providers::{AnalysisProvider, FrameExtractor, ProviderError, ProviderResult, Transcriber};
use serde_json::json;
use tokio::sync::broadcast;

/// Plays back statuses in order, repeating the last one once exhausted.
pub struct Script<T: Clone> {
    queue: Mutex<VecDeque<T>>,
    last: Mutex<Option<T>>,
    delay: Duration,
    calls: AtomicU32,
}

impl<T: Clone> Script<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            queue: Mutex::new(items.into()),
            last: Mutex::new(None),
            delay: Duration::ZERO,
            calls: AtomicU32::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    async fn next(&self) -> T {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let popped = self.queue.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match popped {
            Some(item) => {
                *last = Some(item.clone());
                item
            }
            None => last.clone().expect("script must not be empty"),
        }
    }
}

pub struct FakeFrames(pub Script<DependencyStatus<FrameSet>>);

#[async_trait]
impl FrameExtractor for FakeFrames {
    async fn extract_frames(&self, _video: &VideoRef) -> DependencyStatus<FrameSet> {
        self.0.next().await
    }
}

pub struct FakeTranscriber(pub Script<DependencyStatus<Transcript>>);

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, _audio: &AudioRef) -> DependencyStatus<Transcript> {
        self.0.next().await
    }
}

/// `Ok(true)` answers with a valid report, `Ok(false)` with an invalid one,
/// `Err(status)` with an HTTP error.
pub struct FakeAnalyzer {
    script: Script<Result<bool, u16>>,
    pub requests: Mutex<Vec<AnalysisRequest>>,
}

impl FakeAnalyzer {
    pub fn new(script: Vec<Result<bool, u16>>) -> Self {
        Self {
            script: Script::new(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> u32 {
        self.script.calls()
    }
}

#[async_trait]
impl AnalysisProvider for FakeAnalyzer {
    async fn analyze(&self, request: &AnalysisRequest) -> ProviderResult<RawAnalysisReport> {
        self.requests.lock().unwrap().push(request.clone());
        match self.script.next().await {
            Ok(true) => Ok(valid_report()),
            Ok(false) => {
                let mut report = valid_report();
                report.category_scores.remove("Content Quality");
                Ok(report)
            }
            Err(status) => Err(ProviderError::from_http_status(status, "analysis failed")),
        }
    }
}

pub fn valid_report() -> RawAnalysisReport {
    serde_json::from_value(json!({
        "overall_score": 7.5,
        "category_scores": {
            "Speech Mechanics": 8.0,
            "Content Quality": 7.0,
            "Visual Presentation": 6.5,
            "Overall Effectiveness": 7.5
        },
        "issues": [{
            "timestamp": "0:08",
            "description": "Says 'three points' while the slide lists four",
            "recommendation": "Match the spoken count to the slide",
            "cross_modal_mismatch": true
        }]
    }))
    .unwrap()
}

pub fn frames_ready() -> DependencyStatus<FrameSet> {
    DependencyStatus::Ready(FrameSet::new(vec![
        Frame::new("frame-0", 0.0),
        Frame::new("frame-5", 5.0),
        Frame::new("frame-9", 9.0),
    ]))
}

pub fn transcript_ready() -> DependencyStatus<Transcript> {
    DependencyStatus::Ready(Transcript {
        full_text: "Welcome everyone. We have three points today.".to_string(),
        segments: vec![
            TranscriptSegment::new("Welcome everyone.", 0.0, 3.5, 0.97),
            TranscriptSegment::new("We have three points today.", 5.5, 9.5, 0.94),
        ],
    })
}

pub fn waiting() -> DependencyStatus<Transcript> {
    DependencyStatus::Waiting {
        estimated_seconds: Some(10),
    }
}

pub struct Harness {
    pub orchestrator: Orchestrator,
    pub frames: Arc<FakeFrames>,
    pub transcriber: Arc<FakeTranscriber>,
    pub analyzer: Arc<FakeAnalyzer>,
}

pub fn config(max_retries: u32) -> OrchestratorConfig {
    OrchestratorConfig {
        frames_retry: RetryConfig::new("frame_extraction")
            .with_max_retries(max_retries)
            .with_fixed_delay(Duration::from_secs(3)),
        transcription_retry: RetryConfig::new("transcription")
            .with_max_retries(max_retries)
            .with_fixed_delay(Duration::from_secs(3)),
        ..OrchestratorConfig::default()
    }
}

pub fn harness(
    config: OrchestratorConfig,
    frames: Script<DependencyStatus<FrameSet>>,
    transcript: Script<DependencyStatus<Transcript>>,
    analysis: Vec<Result<bool, u16>>,
) -> Harness {
    let frames = Arc::new(FakeFrames(frames));
    let transcriber = Arc::new(FakeTranscriber(transcript));
    let analyzer = Arc::new(FakeAnalyzer::new(analysis));

    let orchestrator = Orchestrator::new(
        config,
        Providers {
            frames: frames.clone(),
            transcriber: transcriber.clone(),
            analyzer: analyzer.clone(),
        },
    );

    Harness {
        orchestrator,
        frames,
        transcriber,
        analyzer,
    }
}

/// Receive events until the job's terminal event.
pub async fn collect_events(rx: &mut broadcast::Receiver<JobEvent>) -> Vec<JobEvent> {
    let mut events = Vec::new();
    loop {
        match rx.recv().await {
            Ok(event) => {
                let terminal = event.is_terminal();
                events.push(event);
                if terminal {
                    return events;
                }
            }
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => return events,
        }
    }
}
