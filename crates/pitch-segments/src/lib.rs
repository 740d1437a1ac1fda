//! Fixed-duration transcript segment aggregation.
//!
//! Speech-to-text providers emit segments of arbitrary length. This crate
//! re-buckets them into consecutive windows of a fixed duration so that each
//! window can be paired with the frames sampled from the same span of video.
//!
//! - [`parse_document`] / [`read_document`] load `{ "segments": [...] }`
//! - [`aggregate`] produces the fixed windows
//! - [`render_json`] / [`render_srt`] serialize them
//! - [`process_file`] runs the whole pipeline for the `fixed-segments` CLI

pub mod aggregate;
pub mod document;
pub mod error;
pub mod output;

pub use aggregate::{aggregate, FixedSegment, DEFAULT_WINDOW_SECS};
pub use document::{parse_document, read_document, SourceSegment};
pub use error::{SegmentError, SegmentResult};
pub use output::{
    format_srt_timestamp, output_paths, process_file, render_json, render_srt, write_outputs, OutputPaths,
    Summary,
};
