//! Timing lines scraped from miniC2D's console output.
//!
//! miniC2D prints summary lines such as `Vtree Time    0.412s` and
//! `Total Time    13.070s`. The first is used to delay `perf record` past
//! vtree construction, the second is stored next to function percentages.

use std::fmt;
use std::io::{BufRead, BufReader, Read};
use thiserror::Error;

/// Sampling window length after the vtree has been built: two hours.
pub const MAX_DELAY_MS: u64 = 2 * 60 * 60 * 1000;

const VTREE_TIME_MARKER: &str = "Vtree Time";
const TOTAL_TIME_MARKER: &str = "Total Time";

/// Errors raised while scraping a timing line.
#[derive(Error, Debug)]
pub enum TimingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no '{0}' line found")]
    MissingMarker(&'static str),

    #[error("invalid '{marker}' value '{value}'")]
    InvalidNumber { marker: &'static str, value: String },
}

/// Seconds reported on the first line starting with `Total Time`.
pub fn parse_total_time<R: Read>(reader: R) -> Result<f64, TimingError> {
    scrape_seconds(reader, TOTAL_TIME_MARKER)
}

/// Seconds reported on the first line starting with `Vtree Time`.
pub fn parse_vtree_time<R: Read>(reader: R) -> Result<f64, TimingError> {
    scrape_seconds(reader, VTREE_TIME_MARKER)
}

fn scrape_seconds<R: Read>(reader: R, marker: &'static str) -> Result<f64, TimingError> {
    for line_result in BufReader::new(reader).lines() {
        let line = line_result?;
        let line = line.trim();
        if !line.starts_with(marker) {
            continue;
        }
        // Last token, with the unit suffix dropped: "13.070s" -> "13.070".
        let value = line.split_whitespace().last().unwrap_or_default().replace('s', "");
        return match value.parse::<f64>() {
            Ok(seconds) if seconds.is_finite() => Ok(seconds),
            _ => Err(TimingError::InvalidNumber { marker, value }),
        };
    }
    Err(TimingError::MissingMarker(marker))
}

/// `perf record --delay` window, in milliseconds since process start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayWindow {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl fmt::Display for DelayWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_ms, self.end_ms)
    }
}

/// Window starting once vtree construction is over and lasting [`MAX_DELAY_MS`].
///
/// Negative, non-finite or too large durations are rejected.
pub fn delay_window(vtree_seconds: f64) -> Result<DelayWindow, TimingError> {
    let invalid = || TimingError::InvalidNumber {
        marker: VTREE_TIME_MARKER,
        value: vtree_seconds.to_string(),
    };
    let millis = vtree_seconds * 1000.0;
    if !millis.is_finite() || millis < 0.0 || millis >= u64::MAX as f64 {
        return Err(invalid());
    }
    // Truncated toward zero.
    let start_ms = millis as u64;
    let end_ms = start_ms.checked_add(MAX_DELAY_MS).ok_or_else(invalid)?;
    Ok(DelayWindow { start_ms, end_ms })
}
