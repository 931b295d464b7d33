//! Directory layout and run options shared by the drivers.

use c2dprof_parse::DuplicatePolicy;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default limit for one external process: two hours.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

/// Vtree method passed to miniC2D: min-fill elimination order.
///
/// The default method (0) needs hypergraph partitioning libraries that are
/// usually not available.
pub const DEFAULT_VTREE_METHOD: u32 = 4;

/// File-system layout of a benchmark directory.
///
/// Output directories are created on demand by the drivers that write to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Working directory of every external process.
    pub root: PathBuf,
    /// Input `.cnf` files.
    pub cnf_dir: PathBuf,
    /// Generated `<name>.cnf.vtree` files.
    pub vtree_dir: PathBuf,
    /// Console logs of vtree generation.
    pub vtree_log_dir: PathBuf,
    /// Vtree logs of runs considered good enough to profile.
    pub valid_vtree_log_dir: PathBuf,
    /// Console logs of profiled runs.
    pub stdout_dir: PathBuf,
    /// Reports written by the profiling script, `<name>.cnf-perf.log`.
    pub perf_results_dir: PathBuf,
    /// Folded call-graph reports written by `perf report`.
    pub perf_report_dir: PathBuf,
    /// Per-instance JSON output.
    pub function_percents_dir: PathBuf,
    /// Tag list of tracked functions.
    pub tags_file: PathBuf,
    pub compiler: PathBuf,
    /// Wrapper script running the compiler under `perf`.
    pub perf_script: PathBuf,
}

impl Layout {
    /// Standard layout below `root`.
    pub fn rooted(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            root: root.to_path_buf(),
            cnf_dir: root.join("cnfs"),
            vtree_dir: root.join("vtree"),
            vtree_log_dir: root.join("vtree_logs"),
            valid_vtree_log_dir: root.join("vtree_logs").join("valid"),
            stdout_dir: root.join("stdouts"),
            perf_results_dir: root.join("perf_results"),
            perf_report_dir: root.join("perf-report"),
            function_percents_dir: root.join("function_percents"),
            tags_file: root.join("ctags.txt"),
            compiler: root.join("bin").join("linux").join("miniC2D"),
            perf_script: root.join("perf.sh"),
        }
    }

    pub fn vtree_path(&self, cnf_name: &str) -> PathBuf {
        self.vtree_dir.join(format!("{cnf_name}.vtree"))
    }

    pub fn vtree_log_path(&self, cnf_name: &str) -> PathBuf {
        self.vtree_log_dir.join(format!("{cnf_name}.log"))
    }

    pub fn valid_vtree_log_path(&self, cnf_name: &str) -> PathBuf {
        self.valid_vtree_log_dir.join(format!("{cnf_name}.log"))
    }

    pub fn stdout_path(&self, cnf_name: &str) -> PathBuf {
        self.stdout_dir.join(format!("{cnf_name}.log"))
    }

    pub fn perf_results_path(&self, cnf_name: &str) -> PathBuf {
        self.perf_results_dir.join(format!("{cnf_name}-perf.log"))
    }

    pub fn perf_report_path(&self, cnf_name: &str) -> PathBuf {
        self.perf_report_dir.join(format!("{cnf_name}.log"))
    }

    pub fn function_percents_path(&self, cnf_name: &str) -> PathBuf {
        self.function_percents_dir.join(format!("{cnf_name}.json"))
    }

    /// Compiled-circuit file miniC2D leaves next to its input.
    pub fn nnf_path(&self, cnf_name: &str) -> PathBuf {
        self.cnf_dir.join(format!("{cnf_name}.nnf"))
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::rooted(".")
    }
}

/// How a report is turned into function percentages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AggregationMode {
    /// Flat self-time per symbol of the target binary.
    SelfTime,
    /// Folded call-graph attribution to the tracked functions.
    #[default]
    CallGraph,
}

/// Options of a batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Limit for each external process; `None` waits forever.
    pub timeout: Option<Duration>,
    pub vtree_method: u32,
    /// Pass the precomputed vtree with `--vtree` instead of `--vtree_method`.
    pub use_vtree_input: bool,
    pub mode: AggregationMode,
    pub duplicates: DuplicatePolicy,
    /// Add the run's `Total Time` under `_total_time`.
    pub record_total_time: bool,
    /// Shared object name of the compiler in perf reports.
    pub target_binary: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
            vtree_method: DEFAULT_VTREE_METHOD,
            use_vtree_input: false,
            mode: AggregationMode::default(),
            duplicates: DuplicatePolicy::default(),
            record_total_time: false,
            target_binary: "miniC2D".to_string(),
        }
    }
}
