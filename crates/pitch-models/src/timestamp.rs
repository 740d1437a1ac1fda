//! Clock-style timestamp parsing and formatting.
//!
//! Analysis providers sometimes report issue positions as clock strings
//! (`0:05`, `01:02.5`, `00:01:30`) rather than plain seconds. These helpers
//! convert between the two representations.

use thiserror::Error;

/// Longest presentation accepted (4 hours).
pub const MAX_PRESENTATION_SECS: f64 = 14_400.0;

/// Parse a timestamp string to total seconds.
///
/// Supports `HH:MM:SS[.mmm]`, `MM:SS[.mmm]` and `SS[.mmm]`.
///
/// # Examples
/// ```
/// use pitch_models::timestamp::parse_timestamp;
/// assert_eq!(parse_timestamp("0:05").unwrap(), 5.0);
/// assert_eq!(parse_timestamp("01:00:00").unwrap(), 3600.0);
/// assert_eq!(parse_timestamp("42").unwrap(), 42.0);
/// ```
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').collect();
    if parts.len() > 3 {
        return Err(TimestampError::InvalidFormat(ts.to_string()));
    }

    const UNITS: [(&str, f64); 3] = [("seconds", 1.0), ("minutes", 60.0), ("hours", 3600.0)];

    let mut total = 0.0;
    for (part, (name, scale)) in parts.iter().rev().zip(UNITS) {
        let value: f64 = part
            .trim()
            .parse()
            .map_err(|_| TimestampError::InvalidValue(name, part.to_string()))?;
        if !value.is_finite() {
            return Err(TimestampError::InvalidValue(name, part.to_string()));
        }
        if value < 0.0 {
            return Err(TimestampError::Negative);
        }
        total += value * scale;
    }

    if total > MAX_PRESENTATION_SECS {
        return Err(TimestampError::ExceedsMaxDuration(MAX_PRESENTATION_SECS));
    }
    Ok(total)
}

/// Format seconds as a short clock string (`M:SS`, or `H:MM:SS` past an hour).
///
/// Fractional seconds are truncated; this is for display only.
pub fn format_clock(total_secs: f64) -> String {
    let whole = total_secs.max(0.0).floor() as u64;
    let hours = whole / 3600;
    let mins = (whole % 3600) / 60;
    let secs = whole % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}

/// Timestamp parsing error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("Timestamp cannot be empty")]
    Empty,

    #[error("Timestamp cannot be negative")]
    Negative,

    #[error("Invalid {0} value: {1}")]
    InvalidValue(&'static str, String),

    #[error("Invalid timestamp format '{0}'. Use HH:MM:SS, MM:SS or SS")]
    InvalidFormat(String),

    #[error("Timestamp exceeds maximum presentation length ({}s)", .0)]
    ExceedsMaxDuration(f64),
}
