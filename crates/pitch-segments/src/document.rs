//! Loading transcript documents.
//!
//! The input is a speech-to-text dump with a top-level `segments` array.
//! Each segment needs numeric `start`/`end` and a string `text`; any other
//! fields (token ids, log-probs, ...) are ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::error::{SegmentError, SegmentResult};

/// One variable-length input segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl SourceSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn midpoint(&self) -> f64 {
        (self.start + self.end) / 2.0
    }
}

/// Parse a segment document from a JSON string.
pub fn parse_document(input: &str) -> SegmentResult<Vec<SourceSegment>> {
    let value: Value = serde_json::from_str(input).map_err(SegmentError::Parse)?;

    let segments = value
        .get("segments")
        .ok_or_else(|| SegmentError::schema("missing \"segments\" key"))?
        .as_array()
        .ok_or_else(|| SegmentError::schema("\"segments\" must be an array"))?;

    segments
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let segment: SourceSegment = serde_json::from_value(raw.clone())
                .map_err(|e| SegmentError::schema(format!("segment {}: {}", index, e)))?;
            check_segment(index, &segment)?;
            Ok(segment)
        })
        .collect()
}

/// Read and parse a segment document from disk.
pub fn read_document(path: impl AsRef<Path>) -> SegmentResult<Vec<SourceSegment>> {
    let contents = std::fs::read_to_string(path)?;
    parse_document(&contents)
}

fn check_segment(index: usize, segment: &SourceSegment) -> SegmentResult<()> {
    if !segment.start.is_finite() || !segment.end.is_finite() {
        return Err(SegmentError::schema(format!("segment {}: times must be finite", index)));
    }
    if segment.start < 0.0 {
        return Err(SegmentError::schema(format!("segment {}: negative start time", index)));
    }
    // Zero-length segments are legal.
    if segment.end < segment.start {
        return Err(SegmentError::schema(format!(
            "segment {}: end ({}) before start ({})",
            index, segment.end, segment.start
        )));
    }
    Ok(())
}
