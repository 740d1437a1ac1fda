//! Transcript segment aggregation CLI.
//!
//! Usage: `fixed-segments <input-json> [window-seconds]`

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pitch_segments::{process_file, DEFAULT_WINDOW_SECS};

/// Re-bucket speech-to-text segments into fixed-duration windows
#[derive(Parser, Debug)]
#[command(name = "fixed-segments", version, about)]
struct Cli {
    /// Transcript JSON with a top-level "segments" array
    #[arg(value_name = "INPUT_JSON")]
    input: PathBuf,

    /// Window length in seconds
    #[arg(value_name = "WINDOW_SECONDS", default_value_t = DEFAULT_WINDOW_SECS)]
    window_seconds: f64,
}

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(env_filter)
        .init();

    let cli = Cli::parse();

    let summary = process_file(&cli.input, cli.window_seconds)
        .with_context(|| format!("Failed to process {}", cli.input.display()))?;

    println!(
        "Created {} fixed segments of {:?} seconds",
        summary.segment_count, summary.window_secs
    );
    println!("JSON output: {}", summary.paths.json.display());
    println!("SRT output: {}", summary.paths.srt.display());
    Ok(())
}
