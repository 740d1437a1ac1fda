//! HTTP frame extraction adapter.

use async_trait::async_trait;
use pitch_models::{DependencyStatus, Frame, FrameSet, VideoRef};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::ProviderResult;
use crate::status::classify_response;
use crate::traits::FrameExtractor;

#[derive(Debug, Serialize)]
struct FramesRequest<'a> {
    video_ref: &'a str,
}

#[derive(Debug, Deserialize)]
struct FramesResponse {
    frames: Vec<Frame>,
}

/// Client for the frame extraction service (`POST /frames`).
pub struct HttpFrameExtractor {
    http: Client,
    base_url: String,
}

impl HttpFrameExtractor {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ProviderConfig) -> ProviderResult<Self> {
        Ok(Self::new(config.http_client()?, config.frames_url.clone()))
    }
}

#[async_trait]
impl FrameExtractor for HttpFrameExtractor {
    async fn extract_frames(&self, video: &VideoRef) -> DependencyStatus<FrameSet> {
        let url = format!("{}/frames", self.base_url);
        debug!(video_ref = %video, "Requesting frame extraction from {}", url);

        let result = self
            .http
            .post(&url)
            .json(&FramesRequest {
                video_ref: video.as_str(),
            })
            .send()
            .await;

        classify_response::<FramesResponse>("frame_extraction", result)
            .await
            .map(|body| FrameSet::new(body.frames))
    }
}
