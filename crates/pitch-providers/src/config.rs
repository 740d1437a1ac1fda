//! Provider configuration.

use std::time::Duration;

use reqwest::Client;

use crate::error::{ProviderError, ProviderResult};

/// Endpoints and credentials for the external collaborators.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Frame extraction service base URL
    pub frames_url: String,
    /// Speech-to-text service base URL
    pub transcription_url: String,
    /// Multimodal analysis API base URL
    pub analysis_url: String,
    /// Analysis API key
    pub analysis_api_key: Option<String>,
    /// Analysis model name
    pub analysis_model: String,
    /// Response token budget for analysis
    pub analysis_max_tokens: u32,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            frames_url: "http://localhost:8101".to_string(),
            transcription_url: "http://localhost:8102".to_string(),
            analysis_url: "https://api.anthropic.com".to_string(),
            analysis_api_key: None,
            analysis_model: "claude-sonnet-4-5".to_string(),
            analysis_max_tokens: 4096,
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl ProviderConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            frames_url: std::env::var("FRAMES_SERVICE_URL").unwrap_or(defaults.frames_url),
            transcription_url: std::env::var("TRANSCRIPTION_SERVICE_URL")
                .unwrap_or(defaults.transcription_url),
            analysis_url: std::env::var("ANTHROPIC_BASE_URL").unwrap_or(defaults.analysis_url),
            analysis_api_key: std::env::var("ANTHROPIC_API_KEY").ok().filter(|k| !k.is_empty()),
            analysis_model: std::env::var("ANALYSIS_MODEL").unwrap_or(defaults.analysis_model),
            analysis_max_tokens: std::env::var("ANALYSIS_MAX_TOKENS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.analysis_max_tokens),
            request_timeout: Duration::from_secs(
                std::env::var("PROVIDER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
        }
    }

    /// Build the shared HTTP client.
    pub fn http_client(&self) -> ProviderResult<Client> {
        Client::builder()
            .timeout(self.request_timeout)
            .build()
            .map_err(ProviderError::Network)
    }
}

// API key stays out of logs.
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("frames_url", &self.frames_url)
            .field("transcription_url", &self.transcription_url)
            .field("analysis_url", &self.analysis_url)
            .field("analysis_api_key", &self.analysis_api_key.as_ref().map(|_| "<redacted>"))
            .field("analysis_model", &self.analysis_model)
            .field("analysis_max_tokens", &self.analysis_max_tokens)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
