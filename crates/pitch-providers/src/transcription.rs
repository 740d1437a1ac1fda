//! HTTP speech-to-text adapter.

use async_trait::async_trait;
use pitch_models::{AudioRef, DependencyStatus, Transcript};
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::ProviderResult;
use crate::status::classify_response;
use crate::traits::Transcriber;

#[derive(Debug, Serialize)]
struct TranscribeRequest<'a> {
    audio_ref: &'a str,
}

/// Client for the transcription service (`POST /transcribe`).
///
/// Answers `202` with `status: "waiting_for_dependency"` until the audio
/// rendition has been extracted from the upload.
pub struct HttpTranscriber {
    http: Client,
    base_url: String,
}

impl HttpTranscriber {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ProviderConfig) -> ProviderResult<Self> {
        Ok(Self::new(config.http_client()?, config.transcription_url.clone()))
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, audio: &AudioRef) -> DependencyStatus<Transcript> {
        let url = format!("{}/transcribe", self.base_url);
        debug!(audio_ref = audio.as_str(), "Requesting transcription from {}", url);

        let result = self
            .http
            .post(&url)
            .json(&TranscribeRequest {
                audio_ref: audio.as_str(),
            })
            .send()
            .await;

        classify_response::<Transcript>("transcription", result).await
    }
}
