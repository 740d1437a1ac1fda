//! Staged multimodal analysis.
//!
//! 1. prepare the payload (pair frames with transcript windows)
//! 2. dispatch to the provider
//! 3. await the structured response
//! 4. validate it against the report schema
//!
//! A provider error, a timeout or a schema violation in steps 2-4 triggers
//! one automatic retry after a fixed delay. A second failure is terminal.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pitch_models::{
    AnalysisReport, AnalysisRequest, AnalysisStage, Frame, JobId, ProcessingJob, TranscriptWindow,
};
use pitch_providers::AnalysisProvider;

use crate::alignment::{align_frames, build_windows};
use crate::error::AnalysisFailure;
use crate::metrics;
use crate::retry::{retry_async_notify, RetryConfig, RetryResult};

/// Receives analysis progress as it happens.
pub trait AnalysisObserver: Send + Sync {
    /// Entering `stage` on the given 1-based attempt.
    fn on_stage(&self, stage: AnalysisStage, attempt: u32);

    /// The previous attempt failed with `reason`; `next_attempt` follows after `delay`.
    fn on_retry(&self, next_attempt: u32, reason: &str, delay: Duration);
}

/// Observer that ignores progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl AnalysisObserver for NoopObserver {
    fn on_stage(&self, _stage: AnalysisStage, _attempt: u32) {}
    fn on_retry(&self, _next_attempt: u32, _reason: &str, _delay: Duration) {}
}

/// Runs the four analysis stages against a provider.
#[derive(Clone)]
pub struct AnalysisRunner {
    provider: Arc<dyn AnalysisProvider>,
    retry: RetryConfig,
    timeout: Duration,
}

impl AnalysisRunner {
    pub fn new(provider: Arc<dyn AnalysisProvider>, retry: RetryConfig, timeout: Duration) -> Self {
        Self {
            provider,
            retry,
            timeout,
        }
    }

    /// Analyze a job whose branches have both finished.
    ///
    /// Uses the job's transcript windows when present, otherwise the provider
    /// segments one-to-one.
    pub async fn run_for_job(
        &self,
        job: &ProcessingJob,
        observer: &dyn AnalysisObserver,
    ) -> Result<AnalysisReport, AnalysisFailure> {
        let frames = match &job.frame_extraction_result {
            Some(frames) if job.both_branches_done() && !frames.is_empty() => frames,
            _ => return Err(AnalysisFailure::NotReady),
        };
        let segments = match &job.transcript_segments {
            Some(segments) if !segments.is_empty() => segments,
            _ => return Err(AnalysisFailure::NotReady),
        };

        let windows = match &job.transcript_windows {
            Some(windows) => windows.clone(),
            // Passthrough windowing cannot fail.
            None => build_windows(segments, None).unwrap_or_default(),
        };

        self.run(&job.job_id, frames, &windows, observer).await
    }

    /// Run all stages for the given frames and windows.
    pub async fn run(
        &self,
        job_id: &JobId,
        frames: &[Frame],
        windows: &[TranscriptWindow],
        observer: &dyn AnalysisObserver,
    ) -> Result<AnalysisReport, AnalysisFailure> {
        let started = Instant::now();

        observer.on_stage(AnalysisStage::PreparePayload, 1);
        let request = AnalysisRequest {
            job_id: job_id.clone(),
            segments: align_frames(frames, windows),
        };
        let request = &request;

        let result = retry_async_notify(
            &self.retry,
            |attempt| async move {
                observer.on_stage(AnalysisStage::Dispatch, attempt);
                let raw = match tokio::time::timeout(self.timeout, self.provider.analyze(request)).await {
                    Ok(Ok(raw)) => raw,
                    Ok(Err(e)) => return Err(AnalysisFailure::Provider(e)),
                    Err(_) => return Err(AnalysisFailure::TimedOut(self.timeout.as_secs())),
                };

                observer.on_stage(AnalysisStage::AwaitResponse, attempt);
                observer.on_stage(AnalysisStage::Validate, attempt);
                raw.validate().map_err(AnalysisFailure::InvalidReport)
            },
            |next_attempt, err: &AnalysisFailure, delay| {
                metrics::record_analysis_retry();
                observer.on_retry(next_attempt, &err.to_string(), delay);
            },
        )
        .await;

        metrics::record_analysis_duration(started.elapsed().as_secs_f64());

        match result {
            RetryResult::Success(report) => Ok(report),
            RetryResult::Failed { error, attempts } if attempts > 1 => Err(AnalysisFailure::Exhausted {
                attempts,
                last: Box::new(error),
            }),
            RetryResult::Failed { error, .. } => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pitch_models::{RawAnalysisReport, TranscriptSegment};
    use pitch_providers::{ProviderError, ProviderResult};
    use serde_json::json;
    use std::sync::Mutex;

    fn valid_raw() -> RawAnalysisReport {
        serde_json::from_value(json!({
            "overall_score": 6.0,
            "category_scores": {
                "Speech Mechanics": 6.0,
                "Content Quality": 6.0,
                "Visual Presentation": 6.0,
                "Overall Effectiveness": 6.0
            },
            "issues": []
        }))
        .unwrap()
    }

    struct Scripted {
        responses: Mutex<Vec<ProviderResult<RawAnalysisReport>>>,
        requests: Mutex<Vec<AnalysisRequest>>,
    }

    impl Scripted {
        fn new(mut responses: Vec<ProviderResult<RawAnalysisReport>>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AnalysisProvider for Scripted {
        async fn analyze(&self, request: &AnalysisRequest) -> ProviderResult<RawAnalysisReport> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ProviderError::invalid_response("script exhausted")))
        }
    }

    #[derive(Default)]
    struct Recorder {
        stages: Mutex<Vec<(AnalysisStage, u32)>>,
        retries: Mutex<Vec<u32>>,
    }

    impl AnalysisObserver for Recorder {
        fn on_stage(&self, stage: AnalysisStage, attempt: u32) {
            self.stages.lock().unwrap().push((stage, attempt));
        }
        fn on_retry(&self, next_attempt: u32, _reason: &str, _delay: Duration) {
            self.retries.lock().unwrap().push(next_attempt);
        }
    }

    fn runner(provider: Arc<Scripted>) -> AnalysisRunner {
        AnalysisRunner::new(
            provider,
            RetryConfig::new("analysis")
                .with_max_retries(1)
                .with_fixed_delay(Duration::from_secs(3)),
            Duration::from_secs(300),
        )
    }

    fn inputs() -> (Vec<Frame>, Vec<TranscriptWindow>) {
        let frames = vec![Frame::new("f5", 5.0), Frame::new("f8", 8.0)];
        let windows = build_windows(
            &[
                TranscriptSegment::new("Welcome", 0.0, 4.0, 0.9),
                TranscriptSegment::new("three points", 6.0, 9.0, 0.9),
            ],
            Some(5.0),
        )
        .unwrap();
        (frames, windows)
    }

    #[tokio::test]
    async fn test_stages_reported_in_order() {
        let provider = Arc::new(Scripted::new(vec![Ok(valid_raw())]));
        let recorder = Recorder::default();
        let (frames, windows) = inputs();

        let report = runner(provider.clone())
            .run(&JobId::from_string("j"), &frames, &windows, &recorder)
            .await
            .unwrap();

        assert_eq!(report.overall_score, 6.0);
        let stages: Vec<AnalysisStage> = recorder.stages.lock().unwrap().iter().map(|(s, _)| *s).collect();
        assert_eq!(stages, AnalysisStage::ALL.to_vec());

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests[0].segments[1].spoken_text(), "three points");
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_retry_then_success() {
        let provider = Arc::new(Scripted::new(vec![
            Err(ProviderError::from_http_status(500, "boom")),
            Ok(valid_raw()),
        ]));
        let recorder = Recorder::default();
        let (frames, windows) = inputs();

        let result = runner(provider.clone())
            .run(&JobId::from_string("j"), &frames, &windows, &recorder)
            .await;

        assert!(result.is_ok());
        assert_eq!(*recorder.retries.lock().unwrap(), vec![2]);
        assert_eq!(provider.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_schema_violation_twice_is_exhausted() {
        let mut invalid = valid_raw();
        invalid.overall_score = Some(42.0);
        let provider = Arc::new(Scripted::new(vec![Ok(invalid.clone()), Ok(invalid)]));
        let (frames, windows) = inputs();

        let err = runner(provider.clone())
            .run(&JobId::from_string("j"), &frames, &windows, &NoopObserver)
            .await
            .unwrap_err();

        match err {
            AnalysisFailure::Exhausted { attempts, last } => {
                assert_eq!(attempts, 2);
                assert!(matches!(*last, AnalysisFailure::InvalidReport(_)));
            }
            other => panic!("unexpected failure: {:?}", other),
        }
        assert_eq!(provider.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_run_for_job_requires_both_payloads() {
        let provider = Arc::new(Scripted::new(vec![]));
        let job = ProcessingJob::new(pitch_models::VideoRef::new("v"));

        let err = runner(provider.clone()).run_for_job(&job, &NoopObserver).await.unwrap_err();
        assert!(matches!(err, AnalysisFailure::NotReady));
        assert!(provider.requests.lock().unwrap().is_empty());
    }
}
