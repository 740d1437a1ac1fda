//! Orchestrator configuration.

use std::time::Duration;

use crate::retry::{BackoffKind, RetryConfig};

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Retry budget and backoff for the frame extraction branch
    pub frames_retry: RetryConfig,
    /// Retry budget and backoff for the transcription branch
    pub transcription_retry: RetryConfig,
    /// Upper bound on a single provider attempt; exceeding it fails the branch
    pub attempt_timeout: Duration,
    /// Analysis gets exactly one automatic retry after a fixed delay
    pub analysis_retry: RetryConfig,
    /// Upper bound on a single analysis dispatch
    pub analysis_timeout: Duration,
    /// Transcript window length for frame alignment; `None` uses provider segments
    pub transcript_window_secs: Option<f64>,
    /// Capacity of each job's event channel
    pub event_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            frames_retry: RetryConfig::new("frame_extraction")
                .with_max_retries(5)
                .with_fixed_delay(Duration::from_secs(3)),
            transcription_retry: RetryConfig::new("transcription")
                .with_max_retries(5)
                .with_fixed_delay(Duration::from_secs(3)),
            attempt_timeout: Duration::from_secs(120),
            analysis_retry: RetryConfig::new("analysis")
                .with_max_retries(1)
                .with_fixed_delay(Duration::from_secs(3)),
            analysis_timeout: Duration::from_secs(300),
            transcript_window_secs: Some(pitch_segments::DEFAULT_WINDOW_SECS),
            event_capacity: 256,
        }
    }
}

impl OrchestratorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let backoff = std::env::var("RETRY_BACKOFF")
            .ok()
            .and_then(|s| BackoffKind::parse(&s))
            .unwrap_or_default();
        let retry_delay = Duration::from_secs(env_parse("RETRY_DELAY_SECS", 3));

        Self {
            frames_retry: RetryConfig::new("frame_extraction")
                .with_max_retries(env_parse("FRAMES_MAX_RETRIES", 5))
                .with_backoff(backoff.build(retry_delay)),
            transcription_retry: RetryConfig::new("transcription")
                .with_max_retries(env_parse("TRANSCRIPTION_MAX_RETRIES", 5))
                .with_backoff(backoff.build(retry_delay)),
            attempt_timeout: Duration::from_secs(env_parse("ATTEMPT_TIMEOUT_SECS", 120)),
            analysis_retry: RetryConfig::new("analysis")
                .with_max_retries(1)
                .with_fixed_delay(Duration::from_secs(env_parse("ANALYSIS_RETRY_DELAY_SECS", 3))),
            analysis_timeout: Duration::from_secs(env_parse("ANALYSIS_TIMEOUT_SECS", 300)),
            transcript_window_secs: window_from(std::env::var("TRANSCRIPT_WINDOW_SECS").ok()),
            event_capacity: env_parse("JOB_EVENT_CAPACITY", 256),
        }
    }

    pub fn retry_for(&self, branch: pitch_models::Branch) -> &RetryConfig {
        match branch {
            pitch_models::Branch::FrameExtraction => &self.frames_retry,
            pitch_models::Branch::Transcription => &self.transcription_retry,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

// 0 disables re-windowing; unparseable values keep the default.
fn window_from(value: Option<String>) -> Option<f64> {
    match value.and_then(|s| s.trim().parse::<f64>().ok()) {
        Some(secs) if secs == 0.0 => None,
        Some(secs) if secs.is_finite() && secs > 0.0 => Some(secs),
        _ => Some(pitch_segments::DEFAULT_WINDOW_SECS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.transcription_retry.max_retries, 5);
        assert_eq!(config.frames_retry.delay_for_retry(1), Duration::from_secs(3));
        assert_eq!(config.analysis_retry.max_retries, 1);
        assert_eq!(config.transcript_window_secs, Some(5.0));
    }

    #[test]
    fn test_window_from() {
        assert_eq!(window_from(None), Some(5.0));
        assert_eq!(window_from(Some("0".into())), None);
        assert_eq!(window_from(Some("2.5".into())), Some(2.5));
        assert_eq!(window_from(Some("-1".into())), Some(5.0));
        assert_eq!(window_from(Some("abc".into())), Some(5.0));
    }
}
