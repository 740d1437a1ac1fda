//! JSON and subtitle rendering, and the file pipeline used by the CLI.

use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::aggregate::{aggregate, FixedSegment};
use crate::document::read_document;
use crate::error::SegmentResult;

const OUTPUT_SUFFIX: &str = "_fixed_segments";

#[derive(Serialize)]
struct FixedDocument<'a> {
    segments: &'a [FixedSegment],
}

/// Render `{ "segments": [...] }` with two-space indentation.
pub fn render_json(segments: &[FixedSegment]) -> SegmentResult<String> {
    let mut rendered = serde_json::to_string_pretty(&FixedDocument { segments })?;
    rendered.push('\n');
    Ok(rendered)
}

/// Format seconds as `HH:MM:SS.mmm`, rounded to the millisecond.
pub fn format_srt_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let mins = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, mins, secs, millis)
}

/// Render the subtitle document: number, time range, text, blank line.
pub fn render_srt(segments: &[FixedSegment]) -> String {
    let mut out = String::new();
    for seg in segments {
        // Writing to a String cannot fail.
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            seg.id,
            format_srt_timestamp(seg.start),
            format_srt_timestamp(seg.end),
            seg.text
        );
    }
    out
}

/// Output file locations derived from an input path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub json: PathBuf,
    pub srt: PathBuf,
}

/// `<dir>/<stem>_fixed_segments.json` and `.srt` beside the input.
pub fn output_paths(input: &Path) -> OutputPaths {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "segments".to_string());
    let base = format!("{}{}", stem, OUTPUT_SUFFIX);
    OutputPaths {
        json: input.with_file_name(format!("{}.json", base)),
        srt: input.with_file_name(format!("{}.srt", base)),
    }
}

/// Write both renderings to `paths`.
pub fn write_outputs(segments: &[FixedSegment], paths: &OutputPaths) -> SegmentResult<()> {
    std::fs::write(&paths.json, render_json(segments)?)?;
    std::fs::write(&paths.srt, render_srt(segments))?;
    debug!(json = %paths.json.display(), srt = %paths.srt.display(), "Wrote segment outputs");
    Ok(())
}

/// Result of processing one input file.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub segment_count: usize,
    pub window_secs: f64,
    pub paths: OutputPaths,
}

/// Read `input`, aggregate with `window_secs`, and write both outputs.
pub fn process_file(input: &Path, window_secs: f64) -> SegmentResult<Summary> {
    let source = read_document(input)?;
    let fixed = aggregate(&source, window_secs)?;
    let paths = output_paths(input);
    write_outputs(&fixed, &paths)?;

    info!(
        input = %input.display(),
        source_segments = source.len(),
        fixed_segments = fixed.len(),
        window_secs,
        "Aggregated transcript segments"
    );

    Ok(Summary {
        segment_count: fixed.len(),
        window_secs,
        paths,
    })
}
