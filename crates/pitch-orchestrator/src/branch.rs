//! Processing branch tasks.
//!
//! Each branch runs in its own task and never touches the job record. It
//! reports every state change to the job driver as a [`BranchMessage`]; the
//! driver is the only writer, which serializes the readiness join.

use std::future::Future;
use std::time::Duration;

use pitch_models::{AudioRef, Branch, DependencyStatus, FrameSet, Transcript, VideoRef};
use pitch_providers::{FrameExtractor, Transcriber};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::BranchFailure;
use crate::retry::RetryConfig;

/// State change reported by a branch task.
#[derive(Debug, Clone, PartialEq)]
pub enum BranchUpdate {
    /// Dependency not ready; a retry is scheduled after `retry_in_secs`
    Waiting {
        retry_count: u32,
        estimated_seconds: Option<u64>,
        retry_in_secs: u64,
    },
    /// One tick of the retry countdown
    Countdown { seconds_remaining: u64 },
    /// Retry attempt starting
    Retrying { retry_count: u32 },
    FramesReady(FrameSet),
    TranscriptReady(Transcript),
    Failed(BranchFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BranchMessage {
    pub branch: Branch,
    pub update: BranchUpdate,
}

/// One frame extraction attempt, bounded by `timeout`.
pub async fn attempt_frame_extraction(
    extractor: &dyn FrameExtractor,
    video: &VideoRef,
    timeout: Duration,
) -> DependencyStatus<FrameSet> {
    match tokio::time::timeout(timeout, extractor.extract_frames(video)).await {
        Ok(status) => status,
        Err(_) => DependencyStatus::failed(format!(
            "frame extraction attempt timed out after {}s",
            timeout.as_secs()
        )),
    }
}

/// One transcription attempt against the audio rendition of `video`,
/// bounded by `timeout`.
pub async fn attempt_transcription(
    transcriber: &dyn Transcriber,
    video: &VideoRef,
    timeout: Duration,
) -> DependencyStatus<Transcript> {
    let audio = AudioRef::for_video(video);
    match tokio::time::timeout(timeout, transcriber.transcribe(&audio)).await {
        Ok(status) => status,
        Err(_) => DependencyStatus::failed(format!(
            "transcription attempt timed out after {}s",
            timeout.as_secs()
        )),
    }
}

/// Drives one branch through its waiting/retrying cycle.
pub struct BranchRunner {
    branch: Branch,
    retry: RetryConfig,
    tx: mpsc::Sender<BranchMessage>,
}

impl BranchRunner {
    pub fn new(branch: Branch, retry: RetryConfig, tx: mpsc::Sender<BranchMessage>) -> Self {
        Self { branch, retry, tx }
    }

    /// Run attempts until the branch is ready, failed, or the driver is gone.
    ///
    /// Each `Waiting` increments the retry counter. Below `max_retries` the
    /// next attempt starts after the backoff delay, with one countdown tick
    /// per second; the attempt that brings the counter to `max_retries`
    /// fails the branch, so `max_retries` bounds the total attempts.
    pub async fn run<T, F, Fut>(self, mut attempt: F, ready: fn(T) -> BranchUpdate)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DependencyStatus<T>>,
    {
        let mut retry_count = 0u32;

        loop {
            let update = match attempt().await {
                DependencyStatus::Ready(value) => ready(value),
                DependencyStatus::Failed { reason } => BranchUpdate::Failed(BranchFailure::Provider {
                    branch: self.branch,
                    reason,
                }),
                DependencyStatus::Waiting { estimated_seconds } => {
                    retry_count += 1;
                    if retry_count >= self.retry.max_retries {
                        BranchUpdate::Failed(BranchFailure::RetriesExhausted {
                            branch: self.branch,
                            attempts: retry_count,
                        })
                    } else {
                        let delay = self.retry.delay_for_retry(retry_count);
                        let waiting = BranchUpdate::Waiting {
                            retry_count,
                            estimated_seconds,
                            retry_in_secs: whole_seconds(delay),
                        };
                        if !self.send(waiting).await || !self.count_down(delay).await {
                            return;
                        }
                        if !self.send(BranchUpdate::Retrying { retry_count }).await {
                            return;
                        }
                        continue;
                    }
                }
            };

            self.send(update).await;
            return;
        }
    }

    async fn count_down(&self, delay: Duration) -> bool {
        let mut remaining = delay;
        while !remaining.is_zero() {
            let seconds_remaining = whole_seconds(remaining);
            if !self.send(BranchUpdate::Countdown { seconds_remaining }).await {
                return false;
            }
            // Sleep the fractional part first so later ticks land on whole seconds.
            let step = remaining.saturating_sub(Duration::from_secs(seconds_remaining - 1));
            tokio::time::sleep(step).await;
            remaining = remaining.saturating_sub(step);
        }
        true
    }

    /// False once the driver has stopped listening.
    async fn send(&self, update: BranchUpdate) -> bool {
        let message = BranchMessage {
            branch: self.branch,
            update,
        };
        if self.tx.send(message).await.is_err() {
            debug!(branch = self.branch.as_str(), "Job driver gone, stopping branch");
            return false;
        }
        true
    }
}

/// Seconds rounded up.
fn whole_seconds(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitch_models::Frame;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    fn scripted(
        statuses: Vec<DependencyStatus<FrameSet>>,
    ) -> impl FnMut() -> std::future::Ready<DependencyStatus<FrameSet>> {
        let queue = Arc::new(Mutex::new(VecDeque::from(statuses)));
        move || {
            let next = queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| DependencyStatus::failed("script exhausted"));
            std::future::ready(next)
        }
    }

    async fn collect(mut rx: mpsc::Receiver<BranchMessage>) -> Vec<BranchUpdate> {
        let mut updates = Vec::new();
        while let Some(message) = rx.recv().await {
            assert_eq!(message.branch, Branch::FrameExtraction);
            updates.push(message.update);
        }
        updates
    }

    fn runner(max_retries: u32, tx: mpsc::Sender<BranchMessage>) -> BranchRunner {
        BranchRunner::new(
            Branch::FrameExtraction,
            RetryConfig::new("frame_extraction")
                .with_max_retries(max_retries)
                .with_fixed_delay(Duration::from_secs(3)),
            tx,
        )
    }

    #[test]
    fn test_whole_seconds_rounds_up() {
        assert_eq!(whole_seconds(Duration::from_secs(3)), 3);
        assert_eq!(whole_seconds(Duration::from_millis(2500)), 3);
        assert_eq!(whole_seconds(Duration::from_millis(1)), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiting_then_ready_counts_down() {
        let (tx, rx) = mpsc::channel(64);
        let frames = FrameSet::new(vec![Frame::new("f", 5.0)]);
        let attempt = scripted(vec![DependencyStatus::waiting(), DependencyStatus::Ready(frames.clone())]);

        runner(5, tx).run(attempt, BranchUpdate::FramesReady).await;
        let updates = collect(rx).await;

        assert_eq!(
            updates,
            vec![
                BranchUpdate::Waiting {
                    retry_count: 1,
                    estimated_seconds: None,
                    retry_in_secs: 3
                },
                BranchUpdate::Countdown { seconds_remaining: 3 },
                BranchUpdate::Countdown { seconds_remaining: 2 },
                BranchUpdate::Countdown { seconds_remaining: 1 },
                BranchUpdate::Retrying { retry_count: 1 },
                BranchUpdate::FramesReady(frames),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiting_at_max_fails_branch() {
        let (tx, rx) = mpsc::channel(64);
        let attempt = scripted(vec![DependencyStatus::waiting(); 2]);

        runner(2, tx).run(attempt, BranchUpdate::FramesReady).await;
        let updates = collect(rx).await;

        assert_eq!(
            updates.last(),
            Some(&BranchUpdate::Failed(BranchFailure::RetriesExhausted {
                branch: Branch::FrameExtraction,
                attempts: 2
            }))
        );
        let waits = updates
            .iter()
            .filter(|u| matches!(u, BranchUpdate::Waiting { .. }))
            .count();
        assert_eq!(waits, 1);
    }

    #[tokio::test]
    async fn test_provider_failure_is_immediate() {
        let (tx, rx) = mpsc::channel(8);
        let attempt = scripted(vec![DependencyStatus::failed("HTTP 500")]);

        runner(5, tx).run(attempt, BranchUpdate::FramesReady).await;
        let updates = collect(rx).await;

        assert_eq!(updates.len(), 1);
        assert!(matches!(
            &updates[0],
            BranchUpdate::Failed(BranchFailure::Provider { reason, .. }) if reason == "HTTP 500"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_driver_gone() {
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        let calls = Arc::new(Mutex::new(0u32));
        let counter = calls.clone();

        runner(5, tx)
            .run(
                move || {
                    *counter.lock().unwrap() += 1;
                    std::future::ready(DependencyStatus::<FrameSet>::waiting())
                },
                BranchUpdate::FramesReady,
            )
            .await;

        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_is_failed_not_waiting() {
        struct Stalled;

        #[async_trait::async_trait]
        impl FrameExtractor for Stalled {
            async fn extract_frames(&self, _video: &VideoRef) -> DependencyStatus<FrameSet> {
                tokio::time::sleep(Duration::from_secs(600)).await;
                DependencyStatus::waiting()
            }
        }

        let status = attempt_frame_extraction(&Stalled, &VideoRef::new("v"), Duration::from_secs(5)).await;
        assert!(matches!(status, DependencyStatus::Failed { .. }));
    }
}
