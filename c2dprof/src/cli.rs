//! Command-line options shared by the batch binaries.

use crate::config::{AggregationMode, DEFAULT_TIMEOUT, Layout};
use crate::{Result, at_path};
use c2dprof_parse::DuplicatePolicy;
use clap::{Args, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Report shape to aggregate.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Mode {
    /// Flat per-symbol self time of the compiler binary
    SelfTime,
    /// Folded call graph attributed to the functions of the tag list
    CallGraph,
}

impl From<Mode> for AggregationMode {
    fn from(m: Mode) -> Self {
        match m {
            Mode::SelfTime => AggregationMode::SelfTime,
            Mode::CallGraph => AggregationMode::CallGraph,
        }
    }
}

/// Handling of symbols listed more than once in self-time mode.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Duplicates {
    /// Keep the last value
    Overwrite,
    /// Add the values up
    Sum,
}

impl From<Duplicates> for DuplicatePolicy {
    fn from(d: Duplicates) -> Self {
        match d {
            Duplicates::Overwrite => DuplicatePolicy::Overwrite,
            Duplicates::Sum => DuplicatePolicy::Sum,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Benchmark directory holding cnfs/, vtree/, logs and outputs
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Directory of input CNF files (defaults to <root>/cnfs)
    #[arg(long)]
    pub cnf_dir: Option<PathBuf>,

    /// miniC2D binary (defaults to <root>/bin/linux/miniC2D)
    #[arg(long)]
    pub compiler: Option<PathBuf>,

    /// Time limit per external process in seconds (0 disables the limit)
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout_secs: u64,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommonArgs {
    /// Layout below the canonicalized root, with overrides applied.
    ///
    /// External processes run inside the root, so every path is made absolute.
    pub fn layout(&self) -> Result<Layout> {
        let root = std::fs::canonicalize(&self.root).map_err(at_path(&self.root))?;
        let mut layout = Layout::rooted(&root);
        if let Some(dir) = &self.cnf_dir {
            layout.cnf_dir = root.join(dir);
        }
        if let Some(compiler) = &self.compiler {
            layout.compiler = root.join(compiler);
        }
        Ok(layout)
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestArgs {
        #[command(flatten)]
        common: CommonArgs,
    }

    #[test]
    fn defaults() {
        let args = TestArgs::parse_from(["test"]);
        assert_eq!(args.common.root, PathBuf::from("."));
        assert_eq!(args.common.timeout(), Some(Duration::from_secs(7200)));
    }

    #[test]
    fn overrides_are_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().display().to_string();
        let args = TestArgs::parse_from([
            "test",
            "--root",
            root.as_str(),
            "--cnf-dir",
            "inputs",
            "--timeout-secs",
            "0",
        ]);

        let layout = args.common.layout().unwrap();
        let root = std::fs::canonicalize(dir.path()).unwrap();
        assert_eq!(layout.cnf_dir, root.join("inputs"));
        assert_eq!(layout.vtree_dir, root.join("vtree"));
        assert_eq!(args.common.timeout(), None);
    }
}
