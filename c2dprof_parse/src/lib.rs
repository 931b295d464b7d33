//! Parser and aggregator for `perf` reports of miniC2D runs.
//!
//! This library reads the textual output of `perf report` for a single
//! compiler run and turns it into a per-function percentage map. Two report
//! shapes are supported:
//!
//! - [`self_time_percents`] - a flat per-symbol summary where only the
//!   self-time column matters.
//! - [`call_graph_percents`] - a report with folded call-graph stacks beneath
//!   each top-level sample, attributed to a fixed set of tracked functions.
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//! use c2dprof_parse::{TargetFunctions, call_graph_percents};
//!
//! let targets = TargetFunctions::parse(File::open("ctags.txt").unwrap()).unwrap();
//! let report = File::open("perf_results/foo.cnf-perf.log").unwrap();
//! let percents = call_graph_percents(report, &targets).unwrap();
//!
//! for (function, pct) in percents.iter() {
//!     println!("{function}: {pct:.2}%");
//! }
//! ```

use thiserror::Error;

mod aggregate;
mod line;
mod percents;
mod tags;
mod timing;

pub use aggregate::{
    DuplicatePolicy, SelfTimeSummary, call_graph_percents, normalize, self_time_percents,
};
pub use line::{CallStackLine, LineKind, SampleLine, classify_line, match_sample_line};
pub use percents::{FunctionPercents, TOTAL_TIME_KEY};
pub use tags::TargetFunctions;
pub use timing::{
    DelayWindow, MAX_DELAY_MS, TimingError, delay_window, parse_total_time, parse_vtree_time,
};

/// Errors that can occur while reading reports and tag files.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("tag file line {0} has no function name")]
    EmptyTagLine(usize),
}

/// Result type for parsing operations.
pub type Result<T> = std::result::Result<T, ParseError>;
