//! Classification of collaborator responses into [`DependencyStatus`].
//!
//! - `200` with a parseable body is `Ready`
//! - `202` with a `status` of `waiting_for_dependency` or `processing` is
//!   `Waiting`, carrying the optional `estimated_seconds`
//! - anything else, including transport errors, is `Failed`
//!
//! Human-readable `message` fields are carried for logs only and never
//! influence the outcome.

use pitch_models::DependencyStatus;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;

/// Structured status carried by a `202 Accepted` body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingStatus {
    WaitingForDependency,
    Processing,
}

/// Body of a `202 Accepted` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingBody {
    pub status: PendingStatus,
    #[serde(default)]
    pub estimated_seconds: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Classify one HTTP attempt against a collaborator.
pub async fn classify_response<T>(
    provider: &str,
    result: Result<Response, reqwest::Error>,
) -> DependencyStatus<T>
where
    T: DeserializeOwned,
{
    let response = match result {
        Ok(response) => response,
        Err(e) => {
            let err = ProviderError::from_reqwest(e);
            debug!(provider, error = %err, "Provider request failed");
            return DependencyStatus::failed(err.to_string());
        }
    };

    let status = response.status();
    match status {
        StatusCode::OK => match response.json::<T>().await {
            Ok(body) => DependencyStatus::Ready(body),
            Err(e) => {
                debug!(provider, error = %e, "Provider returned an unparseable result");
                DependencyStatus::failed(format!("Invalid {} response: {}", provider, e))
            }
        },
        StatusCode::ACCEPTED => {
            let text = response.text().await.unwrap_or_default();
            match serde_json::from_str::<PendingBody>(&text) {
                Ok(pending) => {
                    debug!(
                        provider,
                        pending_status = ?pending.status,
                        message = pending.message.as_deref().unwrap_or(""),
                        "Provider dependency not ready"
                    );
                    match pending.status {
                        PendingStatus::WaitingForDependency | PendingStatus::Processing => {
                            DependencyStatus::Waiting {
                                estimated_seconds: pending.estimated_seconds,
                            }
                        }
                    }
                }
                Err(e) => {
                    debug!(provider, error = %e, "Provider returned 202 without a pending status");
                    DependencyStatus::failed(format!(
                        "{} returned 202 without a recognised pending status: {}",
                        provider, e
                    ))
                }
            }
        }
        other => {
            let body = response.text().await.unwrap_or_default();
            let err = ProviderError::from_http_status(other.as_u16(), body);
            debug!(provider, status = other.as_u16(), error = %err, "Provider attempt failed");
            DependencyStatus::failed(err.to_string())
        }
    }
}
