//! Per-function runtime percentages for each instance.
//!
//! For every instance without a `function_percents/<name>.json`, the driver
//! runs the profiling script (`perf.sh <cnf> <stdout dir> <perf results dir>`),
//! reads the report it leaves in `perf_results/<name>-perf.log`, aggregates it
//! with the configured [`AggregationMode`] and writes the JSON file.

use crate::config::{AggregationMode, Layout, RunConfig};
use crate::process::{CommandSpec, ProcessOutcome, ProcessRunner};
use crate::processed::{OutputExists, ProcessedCheck, partition_cnfs};
use crate::{BatchSummary, DriverError, Result, at_path};
use c2dprof_parse::{
    DuplicatePolicy, FunctionPercents, TOTAL_TIME_KEY, TargetFunctions, TimingError,
    call_graph_percents, parse_total_time, self_time_percents,
};
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A report aggregation strategy, ready to apply.
#[derive(Debug, Clone)]
pub enum Aggregator {
    SelfTime {
        target_binary: String,
        duplicates: DuplicatePolicy,
    },
    CallGraph {
        targets: TargetFunctions,
    },
}

impl Aggregator {
    /// Build the aggregator for `config`, reading the tag list for call-graph mode.
    pub fn load(config: &RunConfig, tags_file: &Path) -> Result<Self> {
        match config.mode {
            AggregationMode::SelfTime => Ok(Aggregator::SelfTime {
                target_binary: config.target_binary.clone(),
                duplicates: config.duplicates,
            }),
            AggregationMode::CallGraph => {
                let file = File::open(tags_file).map_err(at_path(tags_file))?;
                let targets = TargetFunctions::parse(file).map_err(|source| DriverError::Parse {
                    path: tags_file.to_path_buf(),
                    source,
                })?;
                info!(
                    "Tracking {} functions from {}",
                    targets.len(),
                    tags_file.display()
                );
                Ok(Aggregator::CallGraph { targets })
            }
        }
    }

    pub fn aggregate<R: Read>(&self, report: R) -> c2dprof_parse::Result<FunctionPercents> {
        match self {
            Aggregator::SelfTime {
                target_binary,
                duplicates,
            } => self_time_percents(report, target_binary, *duplicates).map(|(p, _)| p),
            Aggregator::CallGraph { targets } => call_graph_percents(report, targets),
        }
    }

    /// Aggregate the report stored at `path`.
    pub fn aggregate_file(&self, path: &Path) -> Result<FunctionPercents> {
        let file = File::open(path).map_err(at_path(path))?;
        self.aggregate(file).map_err(|source| DriverError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Write `percents` as indented JSON to `path`.
pub fn write_percents(percents: &FunctionPercents, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(at_path(path))?;
    let mut writer = BufWriter::new(file);
    percents.write_json(&mut writer)?;
    writer.flush().map_err(at_path(path))?;
    Ok(())
}

pub struct FunctionPercentsDriver<'a> {
    layout: &'a Layout,
    config: &'a RunConfig,
    runner: &'a dyn ProcessRunner,
    processed: Box<dyn ProcessedCheck + 'a>,
}

impl<'a> FunctionPercentsDriver<'a> {
    /// Driver treating an instance as done once its JSON file exists.
    pub fn new(layout: &'a Layout, config: &'a RunConfig, runner: &'a dyn ProcessRunner) -> Self {
        Self {
            layout,
            config,
            runner,
            processed: Box::new(OutputExists::new(&layout.function_percents_dir, ".json")),
        }
    }

    pub fn with_check(mut self, check: impl ProcessedCheck + 'a) -> Self {
        self.processed = Box::new(check);
        self
    }

    pub async fn run(&self) -> Result<BatchSummary> {
        let layout = self.layout;
        for dir in [
            &layout.stdout_dir,
            &layout.perf_results_dir,
            &layout.function_percents_dir,
        ] {
            fs::create_dir_all(dir).map_err(at_path(dir))?;
        }

        let (cnfs, done) = partition_cnfs(&layout.cnf_dir, self.processed.as_ref())?;
        let mut summary = BatchSummary {
            skipped: done.len(),
            ..BatchSummary::default()
        };
        let names: Vec<_> = cnfs.iter().map(|c| c.name.as_str()).collect();
        info!("Found {} CNFs to process: {:?}", cnfs.len(), names);
        if cnfs.is_empty() {
            return Ok(summary);
        }

        let aggregator = Aggregator::load(self.config, &layout.tags_file)?;

        for (i, cnf) in cnfs.iter().enumerate() {
            info!("Processing CNF {}/{}: {}", i + 1, cnfs.len(), cnf.path.display());

            // The script concatenates its directory arguments with file names,
            // so they carry a trailing separator.
            let command = CommandSpec::new(layout.perf_script.display().to_string())
                .path_arg(&cnf.path)
                .arg(dir_arg(&layout.stdout_dir))
                .arg(dir_arg(&layout.perf_results_dir))
                .working_dir(&layout.root)
                .timeout(self.config.timeout);

            info!("Running miniC2D on {}", cnf.path.display());
            let outcome = self.runner.run(&command).await?;
            info!("Finished running miniC2D on {}", cnf.path.display());
            remove_nnf_files(&layout.cnf_dir)?;

            match outcome {
                ProcessOutcome::Exited { code: Some(0), .. } => {}
                ProcessOutcome::Exited { code, stderr, .. } => {
                    warn!(
                        "Profiling script failed for {} (exit code: {:?}): {}",
                        cnf.name,
                        code,
                        stderr.trim()
                    );
                    summary.failed += 1;
                    continue;
                }
                ProcessOutcome::TimedOut => {
                    warn!("Timeout expired while profiling {}", cnf.name);
                    summary.timed_out += 1;
                    continue;
                }
            }

            let mut percents = aggregator.aggregate_file(&layout.perf_results_path(&cnf.name))?;

            if self.config.record_total_time {
                let stdout_log = layout.stdout_path(&cnf.name);
                let total_time = File::open(&stdout_log)
                    .map_err(TimingError::from)
                    .and_then(parse_total_time);
                match total_time {
                    Ok(seconds) => {
                        percents.insert(TOTAL_TIME_KEY, seconds);
                    }
                    Err(e) => warn!(
                        "No total time for {} in {}: {}",
                        cnf.name,
                        stdout_log.display(),
                        e
                    ),
                }
            }

            write_percents(&percents, &layout.function_percents_path(&cnf.name))?;
            summary.processed += 1;
        }

        info!("Function percentages finished: {summary}");
        Ok(summary)
    }
}

fn dir_arg(dir: &Path) -> String {
    let mut dir: PathBuf = dir.to_path_buf();
    dir.push("");
    dir.display().to_string()
}

/// Compiled circuits are large and not needed once the run is over.
fn remove_nnf_files(dir: &Path) -> Result<()> {
    for entry in fs::read_dir(dir).map_err(at_path(dir))? {
        let path = entry.map_err(at_path(dir))?.path();
        if path.extension().is_some_and(|ext| ext == "nnf") {
            fs::remove_file(&path).map_err(at_path(&path))?;
        }
    }
    Ok(())
}
