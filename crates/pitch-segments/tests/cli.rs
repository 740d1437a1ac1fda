//! End-to-end tests for the `fixed-segments` binary.

use std::path::Path;
use std::process::Command;

use pitch_segments::{process_file, read_document};

fn write_input(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

const TALK: &str = r#"{
  "text": "Hello everyone. Today we begin.",
  "segments": [
    {"id": 0, "start": 0.0, "end": 1.2, "text": " Hello"},
    {"id": 1, "start": 1.2, "end": 4.9, "text": " everyone."},
    {"id": 2, "start": 4.9, "end": 8.0, "text": " Today"},
    {"id": 3, "start": 8.0, "end": 12.3, "text": " we begin."}
  ]
}"#;

#[test]
fn test_cli_writes_json_and_srt() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "talk.json", TALK);

    let output = Command::new(env!("CARGO_BIN_EXE_fixed-segments"))
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Created 3 fixed segments of 5.0 seconds"));
    assert!(stdout.contains("talk_fixed_segments.json"));

    let json_path = dir.path().join("talk_fixed_segments.json");
    let srt_path = dir.path().join("talk_fixed_segments.srt");
    assert!(json_path.exists());

    let srt = std::fs::read_to_string(srt_path).unwrap();
    assert!(srt.starts_with("1\n00:00:00.000 --> 00:00:05.000\nHello everyone.\n\n"));
    assert!(srt.contains("3\n00:00:10.000 --> 00:00:12.300\nwe begin.\n\n"));
}

#[test]
fn test_cli_accepts_window_argument() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "talk.json", TALK);

    let output = Command::new(env!("CARGO_BIN_EXE_fixed-segments"))
        .arg(&input)
        .arg("10")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Created 2 fixed segments of 10.0 seconds"));
}

#[test]
fn test_cli_reports_fractional_window() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "talk.json", TALK);

    let output = Command::new(env!("CARGO_BIN_EXE_fixed-segments"))
        .arg(&input)
        .arg("2.5")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("fixed segments of 2.5 seconds"));
}

#[test]
fn test_cli_fails_on_malformed_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "broken.json", "{\"segments\": [");

    let output = Command::new(env!("CARGO_BIN_EXE_fixed-segments"))
        .arg(&input)
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Parse error"));
    assert!(!dir.path().join("broken_fixed_segments.json").exists());
}

#[test]
fn test_cli_fails_on_missing_segments_key() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "nokey.json", r#"{"text": "hi"}"#);

    let output = Command::new(env!("CARGO_BIN_EXE_fixed-segments"))
        .arg(&input)
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Schema error"));
}

#[test]
fn test_json_output_reaggregates_identically() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "talk.json", TALK);

    let first = process_file(&input, 5.0).unwrap();
    let first_windows = read_document(&first.paths.json).unwrap();

    let second = process_file(&first.paths.json, 5.0).unwrap();
    let second_windows = read_document(&second.paths.json).unwrap();

    assert_eq!(first.segment_count, second.segment_count);
    assert_eq!(first_windows, second_windows);
}

#[test]
fn test_empty_document_produces_empty_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "silent.json", r#"{"segments": []}"#);

    let summary = process_file(&input, 5.0).unwrap();
    assert_eq!(summary.segment_count, 0);
    assert!(read_document(&summary.paths.json).unwrap().is_empty());
    assert_eq!(std::fs::read_to_string(&summary.paths.srt).unwrap(), "");
}
