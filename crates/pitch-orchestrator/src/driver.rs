//! Per-job driver task.
//!
//! The driver owns the job record (through the `watch` sender) and is the
//! only writer. Branch tasks report over an `mpsc` channel, and messages are
//! applied in arrival order. The readiness join is therefore evaluated
//! exactly once per branch state change, with no locking and no timers.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pitch_models::{
    AnalysisProgress, AnalysisStage, Branch, BranchState, FailureRecord, JobEvent, JobId, JobStage,
    ProcessingJob, TransitionError,
};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error};

use crate::alignment::{build_windows, check_transcript_span};
use crate::analysis::{AnalysisObserver, AnalysisRunner};
use crate::branch::{BranchMessage, BranchUpdate};
use crate::config::OrchestratorConfig;
use crate::error::{AnalysisFailure, BranchFailure};
use crate::logging::JobLogger;
use crate::metrics;

pub(crate) struct JobDriver {
    job_id: JobId,
    state: watch::Sender<ProcessingJob>,
    events: broadcast::Sender<JobEvent>,
    analysis: AnalysisRunner,
    config: Arc<OrchestratorConfig>,
    logger: JobLogger,
}

impl JobDriver {
    pub(crate) fn new(
        job_id: JobId,
        state: watch::Sender<ProcessingJob>,
        events: broadcast::Sender<JobEvent>,
        analysis: AnalysisRunner,
        config: Arc<OrchestratorConfig>,
    ) -> Self {
        let logger = JobLogger::new(&job_id, "processing");
        Self {
            job_id,
            state,
            events,
            analysis,
            config,
            logger,
        }
    }

    /// Apply branch updates until the job is terminal.
    ///
    /// Returning drops the update receiver, so a sibling branch still
    /// running after a failure stops at its next report.
    pub(crate) async fn run(self, mut updates: mpsc::Receiver<BranchMessage>) {
        while let Some(message) = updates.recv().await {
            if self.state.borrow().is_terminal() {
                debug!(job_id = %self.job_id, branch = message.branch.as_str(), "Discarding update for terminal job");
                continue;
            }

            self.apply(message);

            if self.state.borrow().ready_for_analysis() {
                self.analyze().await;
            }
            if self.state.borrow().is_terminal() {
                break;
            }
        }
        debug!(job_id = %self.job_id, "Job driver finished");
    }

    fn apply(&self, message: BranchMessage) {
        let BranchMessage { branch, update } = message;
        match update {
            BranchUpdate::Waiting {
                retry_count,
                estimated_seconds,
                retry_in_secs,
            } => self.on_waiting(branch, retry_count, estimated_seconds, retry_in_secs),
            BranchUpdate::Countdown { seconds_remaining } => {
                self.state.send_modify(|job| {
                    job.branch_mut(branch).retry_in_secs = Some(seconds_remaining);
                });
                self.emit(JobEvent::RetryCountdown {
                    job_id: self.job_id.clone(),
                    branch,
                    seconds_remaining,
                });
            }
            BranchUpdate::Retrying { retry_count } => {
                let result = self.update(|job| {
                    job.set_branch_state(branch, BranchState::Retrying)?;
                    job.branch_mut(branch).retry_in_secs = None;
                    Ok(())
                });
                if self.check(result) {
                    self.logger
                        .log_progress(&format!("Retrying {} (retry {})", branch.label(), retry_count));
                    self.emit(JobEvent::BranchRetrying {
                        job_id: self.job_id.clone(),
                        branch,
                        retry_count,
                    });
                }
            }
            BranchUpdate::FramesReady(set) => {
                if set.is_empty() {
                    return self.fail_branch(BranchFailure::EmptyResult { branch });
                }
                let count = set.len();
                let result = self.update(|job| {
                    job.frame_extraction_result = Some(set.into_frames());
                    job.set_branch_state(branch, BranchState::Done)
                });
                self.on_branch_done(branch, count, result);
            }
            BranchUpdate::TranscriptReady(transcript) => {
                if transcript.is_empty() {
                    return self.fail_branch(BranchFailure::EmptyResult { branch });
                }
                if let Err(reason) = check_transcript_span(&transcript.segments) {
                    return self.fail_branch(BranchFailure::Segmentation { branch, reason });
                }
                let windows = match build_windows(&transcript.segments, self.config.transcript_window_secs) {
                    Ok(windows) => windows,
                    Err(e) => {
                        return self.fail_branch(BranchFailure::Segmentation {
                            branch,
                            reason: e.to_string(),
                        })
                    }
                };
                let count = transcript.segments.len();
                let result = self.update(|job| {
                    job.transcript_text = Some(transcript.full_text);
                    job.transcript_segments = Some(transcript.segments);
                    job.transcript_windows = Some(windows);
                    job.set_branch_state(branch, BranchState::Done)
                });
                self.on_branch_done(branch, count, result);
            }
            BranchUpdate::Failed(failure) => self.fail_branch(failure),
        }
    }

    fn on_waiting(&self, branch: Branch, retry_count: u32, estimated_seconds: Option<u64>, retry_in_secs: u64) {
        let result = self.update(|job| {
            job.set_branch_state(branch, BranchState::WaitingForDependency)?;
            let progress = job.branch_mut(branch);
            progress.retry_count = retry_count;
            progress.estimated_seconds = estimated_seconds;
            progress.retry_in_secs = Some(retry_in_secs);
            Ok(())
        });
        if !self.check(result) {
            return;
        }

        let max_retries = self.config.retry_for(branch).max_retries;
        self.logger.log_waiting(branch, retry_count, max_retries, retry_in_secs);
        metrics::record_branch_waiting(branch);

        self.emit(JobEvent::BranchWaiting {
            job_id: self.job_id.clone(),
            branch,
            retry_count,
            max_retries,
            retry_in_secs,
            estimated_seconds,
            message: waiting_message(branch).to_string(),
        });
    }

    fn on_branch_done(&self, branch: Branch, items: usize, result: Result<(), TransitionError>) {
        if !self.check(result) {
            return;
        }
        let elapsed = {
            let job = self.state.borrow();
            (Utc::now() - job.created_at).num_milliseconds().max(0) as f64 / 1000.0
        };
        metrics::record_branch_duration(branch, elapsed);
        self.logger
            .log_progress(&format!("{} complete ({} items)", branch.label(), items));
        self.emit(JobEvent::BranchCompleted {
            job_id: self.job_id.clone(),
            branch,
            items,
        });
    }

    fn fail_branch(&self, failure: BranchFailure) {
        let branch = failure.branch();
        let record = failure.to_record();
        let attempts = match &failure {
            BranchFailure::RetriesExhausted { attempts, .. } => Some(*attempts),
            _ => None,
        };

        let result = self.update(|job| {
            if let Some(attempts) = attempts {
                job.branch_mut(branch).retry_count = attempts;
            }
            job.set_branch_state(branch, BranchState::Failed)
        });
        self.check(result);

        metrics::record_branch_failure(branch);
        self.emit(JobEvent::BranchFailed {
            job_id: self.job_id.clone(),
            branch,
            message: record.message.clone(),
        });
        self.fail_job(record);
    }

    fn fail_job(&self, record: FailureRecord) {
        let from = self.state.borrow().stage;
        let source = record.source.as_str();
        let message = record.message.clone();
        let detail = record.detail.clone();

        let result = self.update(|job| job.fail(record));
        if !self.check(result) {
            return;
        }

        self.logger.log_failure(source, &detail);
        metrics::record_job_failed(source);
        self.emit(JobEvent::StageChanged {
            job_id: self.job_id.clone(),
            from,
            to: JobStage::Failed,
            timestamp: Utc::now(),
        });
        self.emit(JobEvent::Failed {
            job_id: self.job_id.clone(),
            message,
        });
    }

    async fn analyze(&self) {
        let snapshot = self.state.borrow().clone();

        let result = self.update(|job| {
            job.transition_to(JobStage::Analyzing)?;
            job.analysis_started_at = Some(Utc::now());
            Ok(())
        });
        if !self.check(result) {
            return;
        }
        self.emit(JobEvent::StageChanged {
            job_id: self.job_id.clone(),
            from: JobStage::Processing,
            to: JobStage::Analyzing,
            timestamp: Utc::now(),
        });

        let analysis_logger = self.logger.for_operation("analysis");
        analysis_logger.log_start("Both branches done, starting multimodal analysis");

        match self.analysis.run_for_job(&snapshot, self).await {
            Ok(report) => {
                let summary = report.summary();
                let result = self.update(|job| job.complete(report));
                if self.check(result) {
                    analysis_logger.log_completion(&summary);
                    metrics::record_job_completed();
                    self.emit(JobEvent::StageChanged {
                        job_id: self.job_id.clone(),
                        from: JobStage::Analyzing,
                        to: JobStage::Complete,
                        timestamp: Utc::now(),
                    });
                    self.emit(JobEvent::Completed {
                        job_id: self.job_id.clone(),
                        summary,
                    });
                }
            }
            Err(failure) => self.fail_analysis(failure),
        }
    }

    fn fail_analysis(&self, failure: AnalysisFailure) {
        self.fail_job(failure.to_record());
    }

    fn update<F>(&self, f: F) -> Result<(), TransitionError>
    where
        F: FnOnce(&mut ProcessingJob) -> Result<(), TransitionError>,
    {
        let mut outcome = Ok(());
        self.state.send_modify(|job| outcome = f(job));
        outcome
    }

    /// Log a rejected transition; true when the transition applied.
    fn check(&self, result: Result<(), TransitionError>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                error!(job_id = %self.job_id, error = %e, "Rejected job state change");
                false
            }
        }
    }

    fn emit(&self, event: JobEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl AnalysisObserver for JobDriver {
    fn on_stage(&self, stage: AnalysisStage, attempt: u32) {
        let progress = AnalysisProgress::new(stage, attempt);
        self.logger
            .for_operation("analysis")
            .log_progress(&format!("Step {}/4 ({}%): {}", stage.number(), progress.percent, progress.message));
        self.emit(JobEvent::AnalysisProgress {
            job_id: self.job_id.clone(),
            stage,
            percent: progress.percent,
            message: progress.message.clone(),
            attempt,
        });
        self.state.send_modify(|job| {
            job.analysis = Some(progress);
            job.touch();
        });
    }

    fn on_retry(&self, next_attempt: u32, reason: &str, delay: Duration) {
        self.logger.for_operation("analysis").log_warning(&format!(
            "Analysis attempt failed ({}), retrying once in {:?}",
            reason, delay
        ));
        self.emit(JobEvent::AnalysisRetrying {
            job_id: self.job_id.clone(),
            attempt: next_attempt,
            reason: reason.to_string(),
        });
    }
}

fn waiting_message(branch: Branch) -> &'static str {
    match branch {
        Branch::Transcription => "Audio extraction in progress",
        Branch::FrameExtraction => "Video processing in progress",
    }
}
