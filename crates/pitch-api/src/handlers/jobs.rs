//! Job submission, status polling and lifecycle handlers.

use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, Stream, StreamExt};
use pitch_models::{JobEvent, JobId, JobStage, ProcessingJob, VideoRef};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    /// Reference to the uploaded video asset
    pub video_ref: String,
}

/// Returned when a job is accepted for processing.
#[derive(Debug, Serialize)]
pub struct JobAccepted {
    pub job_id: JobId,
    pub stage: JobStage,
}

/// Job snapshot plus a single status label for pollers.
///
/// `status` is `waiting_for_dependency` while a branch waits on its
/// upstream artifact, otherwise the job stage.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub job: ProcessingJob,
}

impl From<ProcessingJob> for JobStatusResponse {
    fn from(job: ProcessingJob) -> Self {
        Self {
            status: job.status_label(),
            job,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JobSummary {
    pub job_id: JobId,
    pub video_ref: VideoRef,
    pub stage: JobStage,
    pub status: &'static str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&ProcessingJob> for JobSummary {
    fn from(job: &ProcessingJob) -> Self {
        Self {
            job_id: job.job_id.clone(),
            video_ref: job.video_ref.clone(),
            stage: job.stage,
            status: job.status_label(),
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobSummary>,
}

/// Accept an uploaded video and start processing.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<SubmitJobRequest>,
) -> ApiResult<(StatusCode, Json<JobAccepted>)> {
    let job_id = state
        .orchestrator
        .submit_upload(VideoRef::new(request.video_ref))
        .await?;
    let job = state.orchestrator.job(&job_id).await?;

    info!(job_id = %job_id, video_ref = %job.video_ref, "Job accepted");
    Ok((
        StatusCode::ACCEPTED,
        Json(JobAccepted {
            job_id,
            stage: job.stage,
        }),
    ))
}

/// Poll a job. `202` while in progress, `200` once complete or failed.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<(StatusCode, Json<JobStatusResponse>)> {
    let job = state.orchestrator.job(&JobId::from_string(job_id)).await?;
    let status = if job.is_terminal() {
        StatusCode::OK
    } else {
        StatusCode::ACCEPTED
    };
    Ok((status, Json(job.into())))
}

pub async fn list_jobs(State(state): State<AppState>) -> Json<JobListResponse> {
    let jobs = state.orchestrator.list_jobs().await;
    Json(JobListResponse {
        jobs: jobs.iter().map(JobSummary::from).collect(),
    })
}

/// Discard the job and process its video again under a new id.
pub async fn restart_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<(StatusCode, Json<JobAccepted>)> {
    let new_id = state.orchestrator.restart(&JobId::from_string(job_id)).await?;
    let job = state.orchestrator.job(&new_id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(JobAccepted {
            job_id: new_id,
            stage: job.stage,
        }),
    ))
}

pub async fn delete_job(State(state): State<AppState>, Path(job_id): Path<String>) -> ApiResult<StatusCode> {
    state.orchestrator.remove(&JobId::from_string(job_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Server-sent events for one job.
///
/// Starts with a `snapshot` event carrying the current record, then relays
/// job events until the terminal one.
pub async fn job_events(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let job_id = JobId::from_string(job_id);
    let rx = state.orchestrator.subscribe(&job_id).await?;
    let snapshot = state.orchestrator.job(&job_id).await?;

    let initial = Event::default()
        .event("snapshot")
        .json_data(JobStatusResponse::from(snapshot.clone()))
        .map_err(|e| ApiError::internal(format!("Failed to encode snapshot: {}", e)))?;

    let updates = stream::unfold((rx, snapshot.is_terminal()), |(mut rx, done)| async move {
        if done {
            return None;
        }
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let terminal = event.is_terminal();
                    return Some((Ok(to_sse(&event)), (rx, terminal)));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    let stream = stream::once(async move { Ok(initial) }).chain(updates);
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_sse(event: &JobEvent) -> Event {
    match Event::default().event(event.event_type()).json_data(event) {
        Ok(sse) => sse,
        Err(e) => {
            warn!(error = %e, event_type = event.event_type(), "Failed to encode job event");
            Event::default().comment("unencodable event")
        }
    }
}
