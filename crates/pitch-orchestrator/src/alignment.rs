//! Pairing frames with the transcript spoken over them.

use pitch_models::timestamp::MAX_PRESENTATION_SECS;
use pitch_models::{AlignedFrame, Frame, TranscriptSegment, TranscriptWindow};
use pitch_segments::{aggregate, SegmentResult, SourceSegment};

/// Reject transcripts whose times are not finite or run past the longest
/// supported presentation. Window count grows with the transcript end, so
/// this runs before any windowing.
pub fn check_transcript_span(segments: &[TranscriptSegment]) -> Result<(), String> {
    for seg in segments {
        if !seg.start_seconds.is_finite() || !seg.end_seconds.is_finite() {
            return Err(format!(
                "segment '{}' has a non-finite time range",
                seg.text.trim()
            ));
        }
        if seg.end_seconds > MAX_PRESENTATION_SECS {
            return Err(format!(
                "segment ends at {}s, beyond the {}s maximum presentation length",
                seg.end_seconds, MAX_PRESENTATION_SECS
            ));
        }
    }
    Ok(())
}

/// Build the transcript windows used for alignment.
///
/// With `Some(window_secs)` the provider segments are re-bucketed into
/// fixed windows; with `None` each provider segment becomes one window.
pub fn build_windows(
    segments: &[TranscriptSegment],
    window_secs: Option<f64>,
) -> SegmentResult<Vec<TranscriptWindow>> {
    let Some(window_secs) = window_secs else {
        return Ok(segments
            .iter()
            .enumerate()
            .map(|(index, seg)| TranscriptWindow {
                id: index as u32 + 1,
                start_seconds: seg.start_seconds,
                end_seconds: seg.end_seconds,
                text: seg.text.trim().to_string(),
            })
            .collect());
    };

    let source: Vec<SourceSegment> = segments
        .iter()
        .map(|seg| SourceSegment::new(seg.start_seconds, seg.end_seconds, seg.text.clone()))
        .collect();

    Ok(aggregate(&source, window_secs)?
        .into_iter()
        .map(|w| TranscriptWindow {
            id: w.id,
            start_seconds: w.start,
            end_seconds: w.end,
            text: w.text,
        })
        .collect())
}

/// Pair each frame with the window it closes.
///
/// A frame at `t` takes the first window with `start < t <= end`, so a frame
/// sampled at 0:05 describes 0:00-0:05. A frame at the very start of a window
/// (e.g. 0:00) falls back to `start <= t < end`. Frames outside every window
/// are kept without transcript text.
pub fn align_frames(frames: &[Frame], windows: &[TranscriptWindow]) -> Vec<AlignedFrame> {
    frames
        .iter()
        .map(|frame| {
            let t = frame.timestamp_seconds;
            let window = windows
                .iter()
                .find(|w| w.start_seconds < t && t <= w.end_seconds)
                .or_else(|| windows.iter().find(|w| w.start_seconds <= t && t < w.end_seconds))
                .cloned();
            AlignedFrame {
                frame: frame.clone(),
                window,
            }
        })
        .collect()
}
