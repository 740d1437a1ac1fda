//! Midpoint bucketing into fixed-duration windows.

use serde::{Deserialize, Serialize};

use crate::document::SourceSegment;
use crate::error::{SegmentError, SegmentResult};

/// Default window length in seconds.
pub const DEFAULT_WINDOW_SECS: f64 = 5.0;

/// One output window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedSegment {
    /// 1-based position
    pub id: u32,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl FixedSegment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Re-bucket `segments` into consecutive windows of `window_secs`.
///
/// Windows are `[t, min(t + D, T))` starting at `t = 0` while `t < T`, where
/// `T` is the end of the last input segment. A segment lands in the window
/// containing its midpoint; the texts of a window are trimmed and joined by a
/// single space in input order. Windows with no speech keep an empty text.
pub fn aggregate(segments: &[SourceSegment], window_secs: f64) -> SegmentResult<Vec<FixedSegment>> {
    if !window_secs.is_finite() || window_secs <= 0.0 {
        return Err(SegmentError::InvalidWindow(window_secs));
    }

    let total = match segments.last() {
        Some(last) => last.end,
        None => return Ok(Vec::new()),
    };

    let mut windows = Vec::new();
    let mut current = 0.0_f64;
    let mut id = 1u32;

    while current < total {
        let window_end = (current + window_secs).min(total);
        if window_end <= current {
            // Window no longer advances at this magnitude.
            return Err(SegmentError::InvalidWindow(window_secs));
        }

        let text = segments
            .iter()
            .filter(|seg| {
                let mid = seg.midpoint();
                current <= mid && mid < window_end
            })
            .map(|seg| seg.text.trim())
            .collect::<Vec<_>>()
            .join(" ");

        windows.push(FixedSegment {
            id,
            start: current,
            end: window_end,
            text,
        });

        current = window_end;
        id += 1;
    }

    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, end: f64, text: &str) -> SourceSegment {
        SourceSegment::new(start, end, text)
    }

    #[test]
    fn test_two_aligned_segments() {
        let windows = aggregate(&[seg(0.0, 5.0, "a"), seg(5.0, 10.0, "b")], 5.0).unwrap();
        assert_eq!(
            windows,
            vec![
                FixedSegment { id: 1, start: 0.0, end: 5.0, text: "a".into() },
                FixedSegment { id: 2, start: 5.0, end: 10.0, text: "b".into() },
            ]
        );
    }

    #[test]
    fn test_empty_input_yields_no_windows() {
        assert!(aggregate(&[], 5.0).unwrap().is_empty());
    }

    #[test]
    fn test_windows_tile_timeline() {
        let input = vec![
            seg(0.0, 1.2, "one"),
            seg(1.2, 4.9, "two"),
            seg(4.9, 8.0, "three"),
            seg(8.0, 12.3, "four"),
        ];
        let windows = aggregate(&input, 5.0).unwrap();

        assert_eq!(windows.first().map(|w| w.start), Some(0.0));
        assert_eq!(windows.last().map(|w| w.end), Some(12.3));
        for pair in windows.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        for (index, window) in windows.iter().enumerate() {
            assert_eq!(window.id as usize, index + 1);
            assert!(window.duration() <= 5.0 + 1e-9);
        }
        assert_eq!(windows[2].end - windows[2].start, 12.3 - 10.0);
    }

    #[test]
    fn test_midpoint_assignment_and_join() {
        // midpoints: 0.6, 3.05, 6.45, 10.15
        let input = vec![
            seg(0.0, 1.2, "  Hello "),
            seg(1.2, 4.9, "everyone."),
            seg(4.9, 8.0, "Today"),
            seg(8.0, 12.3, "we begin"),
        ];
        let windows = aggregate(&input, 5.0).unwrap();
        let texts: Vec<&str> = windows.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["Hello everyone.", "Today", "we begin"]);
    }

    #[test]
    fn test_midpoint_on_boundary_goes_to_later_window() {
        // midpoint exactly 5.0
        let windows = aggregate(&[seg(4.0, 6.0, "edge"), seg(6.0, 10.0, "tail")], 5.0).unwrap();
        assert_eq!(windows[0].text, "");
        assert_eq!(windows[1].text, "edge tail");
    }

    #[test]
    fn test_silent_window_keeps_empty_text() {
        let windows = aggregate(&[seg(0.0, 1.0, "hi"), seg(12.0, 14.0, "bye")], 5.0).unwrap();
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[1].text, "");
    }

    #[test]
    fn test_reaggregation_is_idempotent() {
        let input = vec![seg(0.0, 2.0, "a"), seg(2.0, 7.5, "b"), seg(7.5, 13.0, "c")];
        let first = aggregate(&input, 5.0).unwrap();

        let as_source: Vec<SourceSegment> = first
            .iter()
            .map(|w| SourceSegment::new(w.start, w.end, w.text.clone()))
            .collect();
        let second = aggregate(&as_source, 5.0).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_non_positive_window() {
        let input = vec![seg(0.0, 1.0, "a")];
        assert!(matches!(aggregate(&input, 0.0), Err(SegmentError::InvalidWindow(_))));
        assert!(matches!(aggregate(&input, -2.0), Err(SegmentError::InvalidWindow(_))));
        assert!(matches!(aggregate(&input, f64::NAN), Err(SegmentError::InvalidWindow(_))));
    }

    #[test]
    fn test_zero_duration_input_yields_no_windows() {
        assert!(aggregate(&[seg(0.0, 0.0, "blip")], 5.0).unwrap().is_empty());
    }
}
