//! Job registry and the public orchestrator API.

use std::collections::HashMap;
use std::sync::Arc;

use pitch_models::{Branch, JobEvent, JobId, JobStage, ProcessingJob, VideoRef};
use pitch_providers::{AnalysisProvider, FrameExtractor, Transcriber};
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, Instrument};

use crate::analysis::AnalysisRunner;
use crate::branch::{attempt_frame_extraction, attempt_transcription, BranchRunner, BranchUpdate};
use crate::config::OrchestratorConfig;
use crate::driver::JobDriver;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::logging::JobLogger;
use crate::metrics;

/// External collaborators used by every job.
#[derive(Clone)]
pub struct Providers {
    pub frames: Arc<dyn FrameExtractor>,
    pub transcriber: Arc<dyn Transcriber>,
    pub analyzer: Arc<dyn AnalysisProvider>,
}

struct JobHandle {
    state: watch::Receiver<ProcessingJob>,
    events: broadcast::Sender<JobEvent>,
    tasks: Vec<JoinHandle<()>>,
}

impl JobHandle {
    fn abort(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Coordinates upload -> {frame extraction, transcription} -> analysis.
#[derive(Clone)]
pub struct Orchestrator {
    config: Arc<OrchestratorConfig>,
    providers: Providers,
    jobs: Arc<RwLock<HashMap<JobId, JobHandle>>>,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig, providers: Providers) -> Self {
        Self {
            config: Arc::new(config),
            providers,
            jobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Accept an uploaded video and start both branches.
    ///
    /// The job is in `processing` when this returns; progress is observed
    /// through [`watch`](Self::watch), [`subscribe`](Self::subscribe) or
    /// [`job`](Self::job).
    pub async fn submit_upload(&self, video_ref: VideoRef) -> OrchestratorResult<JobId> {
        if video_ref.is_blank() {
            return Err(OrchestratorError::invalid_upload("video reference is empty"));
        }

        let mut job = ProcessingJob::new(video_ref.clone());
        job.transition_to(JobStage::Uploading)?;
        job.transition_to(JobStage::Processing)?;
        let job_id = job.job_id.clone();

        let logger = JobLogger::new(&job_id, "processing");
        logger.log_start(&format!("Upload accepted for video {}", video_ref));

        let (state_tx, state_rx) = watch::channel(job);
        let (events_tx, _) = broadcast::channel(self.config.event_capacity.max(1));
        let (branch_tx, branch_rx) = mpsc::channel(64);

        // Subscribers may only attach once the handle is registered, so the
        // record is inserted before any task starts.
        let mut jobs = self.jobs.write().await;

        let timeout = self.config.attempt_timeout;
        let frames_task = {
            let extractor = self.providers.frames.clone();
            let video = video_ref.clone();
            let runner = BranchRunner::new(
                Branch::FrameExtraction,
                self.config.frames_retry.clone(),
                branch_tx.clone(),
            );
            tokio::spawn(
                runner
                    .run(
                        move || {
                            let extractor = extractor.clone();
                            let video = video.clone();
                            async move { attempt_frame_extraction(extractor.as_ref(), &video, timeout).await }
                        },
                        BranchUpdate::FramesReady,
                    )
                    .instrument(logger.for_operation("frame_extraction").create_span()),
            )
        };

        let transcription_task = {
            let transcriber = self.providers.transcriber.clone();
            let video = video_ref.clone();
            let runner = BranchRunner::new(
                Branch::Transcription,
                self.config.transcription_retry.clone(),
                branch_tx,
            );
            tokio::spawn(
                runner
                    .run(
                        move || {
                            let transcriber = transcriber.clone();
                            let video = video.clone();
                            async move { attempt_transcription(transcriber.as_ref(), &video, timeout).await }
                        },
                        BranchUpdate::TranscriptReady,
                    )
                    .instrument(logger.for_operation("transcription").create_span()),
            )
        };

        let analysis = AnalysisRunner::new(
            self.providers.analyzer.clone(),
            self.config.analysis_retry.clone(),
            self.config.analysis_timeout,
        );
        let driver = JobDriver::new(job_id.clone(), state_tx, events_tx.clone(), analysis, self.config.clone());
        let driver_task = tokio::spawn(driver.run(branch_rx).instrument(logger.create_span()));

        jobs.insert(
            job_id.clone(),
            JobHandle {
                state: state_rx,
                events: events_tx,
                tasks: vec![frames_task, transcription_task, driver_task],
            },
        );
        drop(jobs);

        metrics::record_job_submitted();
        Ok(job_id)
    }

    /// Current snapshot of a job.
    pub async fn job(&self, job_id: &JobId) -> OrchestratorResult<ProcessingJob> {
        let jobs = self.jobs.read().await;
        let handle = jobs
            .get(job_id)
            .ok_or_else(|| OrchestratorError::JobNotFound(job_id.clone()))?;
        let snapshot = handle.state.borrow().clone();
        Ok(snapshot)
    }

    /// Receiver that yields every new snapshot of the job.
    pub async fn watch(&self, job_id: &JobId) -> OrchestratorResult<watch::Receiver<ProcessingJob>> {
        let jobs = self.jobs.read().await;
        jobs.get(job_id)
            .map(|handle| handle.state.clone())
            .ok_or_else(|| OrchestratorError::JobNotFound(job_id.clone()))
    }

    /// Receiver of job events from now on.
    pub async fn subscribe(&self, job_id: &JobId) -> OrchestratorResult<broadcast::Receiver<JobEvent>> {
        let jobs = self.jobs.read().await;
        jobs.get(job_id)
            .map(|handle| handle.events.subscribe())
            .ok_or_else(|| OrchestratorError::JobNotFound(job_id.clone()))
    }

    /// Wait until the job is `complete` or `failed` and return it.
    pub async fn wait_for_terminal(&self, job_id: &JobId) -> OrchestratorResult<ProcessingJob> {
        let mut rx = self.watch(job_id).await?;
        let outcome = rx.wait_for(|job| job.is_terminal()).await.map(|job| job.clone());
        match outcome {
            Ok(job) => Ok(job),
            Err(_) => {
                // Driver stopped without a terminal state (removed or aborted).
                let job = rx.borrow().clone();
                if job.is_terminal() {
                    Ok(job)
                } else {
                    Err(OrchestratorError::internal(format!(
                        "job {} stopped in stage {}",
                        job_id, job.stage
                    )))
                }
            }
        }
    }

    /// Drop a job and stop its tasks.
    pub async fn remove(&self, job_id: &JobId) -> OrchestratorResult<ProcessingJob> {
        let handle = self
            .jobs
            .write()
            .await
            .remove(job_id)
            .ok_or_else(|| OrchestratorError::JobNotFound(job_id.clone()))?;
        handle.abort();
        let snapshot = handle.state.borrow().clone();
        info!(job_id = %job_id, stage = %snapshot.stage, "Job removed");
        Ok(snapshot)
    }

    /// Discard a job and process the same video from the start.
    ///
    /// This is the only recovery path after a terminal failure.
    pub async fn restart(&self, job_id: &JobId) -> OrchestratorResult<JobId> {
        let old = self.remove(job_id).await?;
        let new_id = self.submit_upload(old.video_ref).await?;
        info!(old_job_id = %job_id, new_job_id = %new_id, "Job restarted");
        Ok(new_id)
    }

    /// Snapshots of all known jobs, oldest first.
    pub async fn list_jobs(&self) -> Vec<ProcessingJob> {
        let jobs = self.jobs.read().await;
        let mut snapshots: Vec<ProcessingJob> = jobs.values().map(|h| h.state.borrow().clone()).collect();
        snapshots.sort_by_key(|job| job.created_at);
        snapshots
    }
}
