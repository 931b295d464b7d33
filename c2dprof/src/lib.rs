//! Batch drivers for profiling miniC2D with `perf`.
//!
//! This crate walks a directory of CNF instances and, one instance at a time,
//! drives the external tools and stores the results:
//!
//! - [`vtree`] - build a vtree for every instance with `miniC2D --vtree_out`
//! - [`record`] - run `perf record` past vtree construction and save the
//!   folded `perf report`
//! - [`functions`] - run the profiling script and turn each report into a
//!   per-function percentage JSON file
//!
//! Every driver skips instances whose output already exists, so a batch can be
//! interrupted and restarted. External processes go through a
//! [`process::ProcessRunner`], and the "already done" decision through a
//! [`processed::ProcessedCheck`], so both can be replaced in tests.
//!
//! # Example
//!
//! ```no_run
//! use c2dprof::config::{Layout, RunConfig};
//! use c2dprof::functions::FunctionPercentsDriver;
//! use c2dprof::process::TokioRunner;
//!
//! # async fn demo() -> c2dprof::Result<()> {
//! let layout = Layout::rooted("/data/benchmarks");
//! let config = RunConfig::default();
//! let runner = TokioRunner;
//!
//! let summary = FunctionPercentsDriver::new(&layout, &config, &runner).run().await?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub mod cli;
pub mod config;
pub mod functions;
pub mod logging;
pub mod process;
pub mod processed;
pub mod record;
pub mod vtree;

#[cfg(test)]
mod testing;

// Re-export c2dprof_parse for convenience
pub use c2dprof_parse;

/// Errors that abort a batch.
///
/// Failures of the external tools are not errors: they are logged and the
/// driver moves on to the next instance.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to access '{path}': {source}")]
    Path {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: c2dprof_parse::ParseError,
    },

    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, DriverError>;

/// Per-batch counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Instances whose output was produced by this run.
    pub processed: usize,
    /// Instances left alone (already done, or prerequisites missing).
    pub skipped: usize,
    /// Instances whose external process exited with a failure.
    pub failed: usize,
    pub timed_out: usize,
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed, {} skipped, {} failed, {} timed out",
            self.processed, self.skipped, self.failed, self.timed_out
        )
    }
}

/// Attach the offending path to an IO error.
pub(crate) fn at_path(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> DriverError {
    let path = path.into();
    move |source| DriverError::Path { path, source }
}
