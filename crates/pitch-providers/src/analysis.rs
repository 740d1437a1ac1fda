//! Multimodal analysis via the Anthropic Messages API.
//!
//! Each aligned time window becomes a text block (time range and spoken
//! text) followed by the frame image, so the model sees what was said next
//! to what was shown. The first text block of the reply is parsed as a
//! [`RawAnalysisReport`].

use async_trait::async_trait;
use pitch_models::timestamp::format_clock;
use pitch_models::{AlignedFrame, AnalysisRequest, RawAnalysisReport};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ProviderConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::traits::AnalysisProvider;

const ANTHROPIC_VERSION: &str = "2023-06-01";

const SYSTEM_PROMPT: &str = r#"You are a presentation coach reviewing a recorded talk.
You receive the talk as a sequence of time windows. Each window has the words spoken
during that window followed by a frame captured from the video at that moment.

Score the talk on four categories, each from 0.0 to 10.0:
- Speech Mechanics
- Content Quality
- Visual Presentation
- Overall Effectiveness

List concrete issues with a timestamp in seconds. Set cross_modal_mismatch to true
when what is said contradicts what is shown (for example the speaker says "three
points" while the slide lists four).

Return ONLY a single JSON object with this schema:
{
  "overall_score": 0.0,
  "category_scores": {
    "Speech Mechanics": 0.0,
    "Content Quality": 0.0,
    "Visual Presentation": 0.0,
    "Overall Effectiveness": 0.0
  },
  "issues": [
    {
      "timestamp": 0.0,
      "description": "What went wrong",
      "recommendation": "How to fix it",
      "cross_modal_mismatch": false
    }
  ]
}"#;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    kind: &'static str,
    url: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Analysis provider backed by the Anthropic Messages API.
pub struct AnthropicAnalysisProvider {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicAnalysisProvider {
    pub fn new(http: Client, base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 4096,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn from_config(config: &ProviderConfig) -> ProviderResult<Self> {
        let api_key = config
            .analysis_api_key
            .clone()
            .ok_or_else(|| ProviderError::config("ANTHROPIC_API_KEY not set"))?;
        Ok(Self::new(
            config.http_client()?,
            config.analysis_url.clone(),
            api_key,
            config.analysis_model.clone(),
        )
        .with_max_tokens(config.analysis_max_tokens))
    }

    fn build_content(request: &AnalysisRequest) -> Vec<ContentBlock> {
        let mut blocks = Vec::with_capacity(request.segments.len() * 2 + 1);
        blocks.push(ContentBlock::Text {
            text: format!(
                "Presentation with {} aligned time windows follows.",
                request.segments.len()
            ),
        });
        for aligned in &request.segments {
            blocks.push(ContentBlock::Text {
                text: window_caption(aligned),
            });
            blocks.push(ContentBlock::Image {
                source: ImageSource {
                    kind: "url",
                    url: aligned.frame.image_ref.clone(),
                },
            });
        }
        blocks
    }
}

fn window_caption(aligned: &AlignedFrame) -> String {
    let frame_at = format_clock(aligned.frame.timestamp_seconds);
    match &aligned.window {
        Some(window) => format!(
            "[{} - {}] frame at {} ({:.1}s). Spoken: \"{}\"",
            format_clock(window.start_seconds),
            format_clock(window.end_seconds),
            frame_at,
            aligned.frame.timestamp_seconds,
            window.text
        ),
        None => format!(
            "Frame at {} ({:.1}s). No speech in this window.",
            frame_at, aligned.frame.timestamp_seconds
        ),
    }
}

/// Strip a surrounding markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

#[async_trait]
impl AnalysisProvider for AnthropicAnalysisProvider {
    async fn analyze(&self, request: &AnalysisRequest) -> ProviderResult<RawAnalysisReport> {
        let url = format!("{}/v1/messages", self.base_url);

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: Self::build_content(request),
            }],
        };

        info!(
            job_id = %request.job_id,
            model = %self.model,
            windows = request.segments.len(),
            "Dispatching multimodal analysis"
        );

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_http_status(status, text));
        }

        let parsed: MessagesResponse = response.json().await.map_err(ProviderError::from_reqwest)?;

        let text = parsed
            .content
            .iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text.as_deref())
            .ok_or_else(|| ProviderError::invalid_response("No text block in analysis response"))?;

        debug!(job_id = %request.job_id, chars = text.len(), "Received analysis response");

        serde_json::from_str(strip_code_fence(text))
            .map_err(|e| ProviderError::invalid_response(format!("Failed to parse report JSON: {}", e)))
    }
}
