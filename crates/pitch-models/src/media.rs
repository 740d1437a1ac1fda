//! Frames, transcript segments and the aligned analysis payload.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::job::JobId;

/// A still image sampled from the video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Frame {
    /// Provider-side handle or URL of the image
    pub image_ref: String,
    pub timestamp_seconds: f64,
}

impl Frame {
    pub fn new(image_ref: impl Into<String>, timestamp_seconds: f64) -> Self {
        Self {
            image_ref: image_ref.into(),
            timestamp_seconds,
        }
    }
}

/// Frame extraction result, ordered by timestamp.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct FrameSet {
    pub frames: Vec<Frame>,
}

impl FrameSet {
    pub fn new(mut frames: Vec<Frame>) -> Self {
        frames.sort_by(|a, b| a.timestamp_seconds.total_cmp(&b.timestamp_seconds));
        Self { frames }
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }
}

/// One span of recognized speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TranscriptSegment {
    pub text: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
    #[serde(default)]
    pub confidence: f64,
}

impl TranscriptSegment {
    pub fn new(text: impl Into<String>, start_seconds: f64, end_seconds: f64, confidence: f64) -> Self {
        Self {
            text: text.into(),
            start_seconds,
            end_seconds,
            confidence,
        }
    }
}

/// Transcription result.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Transcript {
    #[serde(default)]
    pub full_text: String,
    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Fixed-duration slice of the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TranscriptWindow {
    /// 1-based position
    pub id: u32,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub text: String,
}

/// A frame paired with the transcript window spoken over it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AlignedFrame {
    pub frame: Frame,
    /// `None` when the frame falls outside every window
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<TranscriptWindow>,
}

impl AlignedFrame {
    pub fn spoken_text(&self) -> &str {
        self.window.as_ref().map(|w| w.text.as_str()).unwrap_or("")
    }
}

/// Payload sent to the multimodal analysis provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisRequest {
    pub job_id: JobId,
    pub segments: Vec<AlignedFrame>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_set_orders_by_timestamp() {
        let set = FrameSet::new(vec![
            Frame::new("c", 10.0),
            Frame::new("a", 0.0),
            Frame::new("b", 5.0),
        ]);
        let refs: Vec<&str> = set.frames.iter().map(|f| f.image_ref.as_str()).collect();
        assert_eq!(refs, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_transcript_confidence_defaults() {
        let transcript: Transcript = serde_json::from_str(
            r#"{"segments": [{"text": "hi", "start_seconds": 0.0, "end_seconds": 1.5}]}"#,
        )
        .unwrap();
        assert_eq!(transcript.full_text, "");
        assert_eq!(transcript.segments[0].confidence, 0.0);
    }

    #[test]
    fn test_unaligned_frame_has_no_text() {
        let aligned = AlignedFrame {
            frame: Frame::new("f", 99.0),
            window: None,
        };
        assert_eq!(aligned.spoken_text(), "");
    }
}
