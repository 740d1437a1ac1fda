//! Segment aggregation error types.

use thiserror::Error;

pub type SegmentResult<T> = Result<T, SegmentError>;

#[derive(Debug, Error)]
pub enum SegmentError {
    /// Input is not valid JSON.
    #[error("Parse error: {0}")]
    Parse(serde_json::Error),

    /// Input is JSON but not a segment document.
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Window length must be a positive number of seconds, got {0}")]
    InvalidWindow(f64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SegmentError {
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// True for errors caused by the input document rather than the environment.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::Schema(_) | Self::InvalidWindow(_))
    }
}
