//! Application state.

use std::sync::Arc;

use pitch_orchestrator::{Orchestrator, OrchestratorConfig, Providers};
use pitch_providers::{AnthropicAnalysisProvider, HttpFrameExtractor, HttpTranscriber, ProviderConfig};
use tracing::info;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub orchestrator: Orchestrator,
}

impl AppState {
    pub fn new(config: ApiConfig, orchestrator: Orchestrator) -> Self {
        Self { config, orchestrator }
    }

    /// Build the orchestrator with HTTP providers configured from the environment.
    pub fn from_env(config: ApiConfig) -> anyhow::Result<Self> {
        let provider_config = ProviderConfig::from_env();
        info!(?provider_config, "Provider config");

        let providers = Providers {
            frames: Arc::new(HttpFrameExtractor::from_config(&provider_config)?),
            transcriber: Arc::new(HttpTranscriber::from_config(&provider_config)?),
            analyzer: Arc::new(AnthropicAnalysisProvider::from_config(&provider_config)?),
        };

        let orchestrator_config = OrchestratorConfig::from_env();
        info!(
            frames_max_retries = orchestrator_config.frames_retry.max_retries,
            transcription_max_retries = orchestrator_config.transcription_retry.max_retries,
            window_secs = ?orchestrator_config.transcript_window_secs,
            "Orchestrator config"
        );

        Ok(Self::new(config, Orchestrator::new(orchestrator_config, providers)))
    }
}
