//! Batch `perf record` / `perf report` collection.
//!
//! Only instances with a log in `vtree_logs/valid/` are profiled. The log's
//! `Vtree Time` sets the start of the `perf record --delay` window, so the
//! samples cover compilation and not vtree construction. After recording, the
//! folded call-graph report is demangled through `c++filt` into
//! `perf-report/<name>.log`.

use crate::config::{Layout, RunConfig};
use crate::process::{CommandSpec, ProcessOutcome, ProcessRunner};
use crate::processed::{CnfInput, OutputExists, ProcessedCheck, list_cnfs};
use crate::{BatchSummary, Result, at_path};
use c2dprof_parse::{DelayWindow, TimingError, delay_window, parse_vtree_time};
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info, warn};

const PERF_REPORT_PIPELINE: &str = "perf report -g --call-graph=folded,0.01 --stdio | c++filt";

pub struct PerfRecordDriver<'a> {
    layout: &'a Layout,
    config: &'a RunConfig,
    runner: &'a dyn ProcessRunner,
    processed: Box<dyn ProcessedCheck + 'a>,
}

impl<'a> PerfRecordDriver<'a> {
    /// Driver treating an instance as done once its perf report exists.
    pub fn new(layout: &'a Layout, config: &'a RunConfig, runner: &'a dyn ProcessRunner) -> Self {
        Self {
            layout,
            config,
            runner,
            processed: Box::new(OutputExists::new(&layout.perf_report_dir, ".log")),
        }
    }

    pub fn with_check(mut self, check: impl ProcessedCheck + 'a) -> Self {
        self.processed = Box::new(check);
        self
    }

    pub async fn run(&self) -> Result<BatchSummary> {
        let layout = self.layout;
        fs::create_dir_all(&layout.stdout_dir).map_err(at_path(&layout.stdout_dir))?;
        fs::create_dir_all(&layout.perf_report_dir).map_err(at_path(&layout.perf_report_dir))?;

        let mut summary = BatchSummary::default();
        for cnf in list_cnfs(&layout.cnf_dir)? {
            let vtree_log = layout.valid_vtree_log_path(&cnf.name);
            if !vtree_log.exists() {
                debug!("Skipping {}: no valid vtree log", cnf.name);
                summary.skipped += 1;
                continue;
            }
            if self.processed.is_already_processed(&cnf.name) {
                info!("Skipping {}: perf report already exists", cnf.name);
                summary.skipped += 1;
                continue;
            }
            if self.config.use_vtree_input && !layout.vtree_path(&cnf.name).exists() {
                warn!("Skipping {}: VTree not found.", cnf.name);
                summary.skipped += 1;
                continue;
            }
            let window = match read_delay_window(&vtree_log) {
                Ok(window) => window,
                Err(e) => {
                    warn!("Failed to parse vtree time from {}: {}", vtree_log.display(), e);
                    warn!("Skipping {}: Could not determine delay range.", cnf.name);
                    summary.skipped += 1;
                    continue;
                }
            };

            let record = self.record_command(&cnf, window);
            info!("Profiling {} with --delay={}", cnf.name, window);
            info!("Command: {}", record.display());
            match self.runner.run(&record).await? {
                ProcessOutcome::Exited { code: Some(0), .. } => {
                    info!("Finished profiling {}", cnf.name);
                }
                ProcessOutcome::Exited { code, .. } => {
                    warn!("Failed to profile {} (exit code: {:?})", cnf.name, code);
                    summary.failed += 1;
                    continue;
                }
                ProcessOutcome::TimedOut => {
                    warn!("Timeout expired while profiling {}", cnf.name);
                    summary.timed_out += 1;
                    continue;
                }
            }

            info!("Generating perf report for {}...", cnf.name);
            let report = CommandSpec::shell(PERF_REPORT_PIPELINE)
                .working_dir(&layout.root)
                .timeout(self.config.timeout)
                .output_to(layout.perf_report_path(&cnf.name));
            let outcome = self.runner.run(&report).await?;
            if !outcome.success() {
                warn!("perf report for {} did not complete: {:?}", cnf.name, outcome);
            }

            self.cleanup(&cnf)?;
            info!("Cleanup done for {}", cnf.name);
            summary.processed += 1;
        }

        info!("Profiling finished: {summary}");
        Ok(summary)
    }

    fn record_command(&self, cnf: &CnfInput, window: DelayWindow) -> CommandSpec {
        let layout = self.layout;
        let command = CommandSpec::new("perf")
            .arg("record")
            .arg("--call-graph")
            .arg("dwarf")
            .arg(format!("--delay={window}"))
            .path_arg(&layout.compiler)
            .arg("--cnf")
            .path_arg(&cnf.path);
        let command = if self.config.use_vtree_input {
            command.arg("--vtree").path_arg(&layout.vtree_path(&cnf.name))
        } else {
            command
                .arg("--vtree_method")
                .arg(self.config.vtree_method.to_string())
        };
        command
            .working_dir(&layout.root)
            .timeout(self.config.timeout)
            .output_to(layout.stdout_path(&cnf.name))
    }

    /// Remove the compiled circuit and perf's data files.
    fn cleanup(&self, cnf: &CnfInput) -> Result<()> {
        let layout = self.layout;
        let artifacts = [
            layout.nnf_path(&cnf.name),
            layout.root.join("perf.data"),
            layout.root.join("perf.data.old"),
        ];
        for path in &artifacts {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(at_path(path)(e)),
            }
        }
        Ok(())
    }
}

fn read_delay_window(vtree_log: &Path) -> std::result::Result<DelayWindow, TimingError> {
    let seconds = parse_vtree_time(File::open(vtree_log)?)?;
    delay_window(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::OutputSink;
    use crate::testing::{RecordingRunner, exited};

    fn bench_dir(cnfs: &[(&str, Option<&str>)]) -> (tempfile::TempDir, Layout) {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::rooted(dir.path());
        fs::create_dir_all(&layout.cnf_dir).unwrap();
        fs::create_dir_all(&layout.valid_vtree_log_dir).unwrap();
        for (name, vtree_log) in cnfs {
            fs::write(layout.cnf_dir.join(name), "p cnf 1 1\n1 0\n").unwrap();
            if let Some(log) = vtree_log {
                fs::write(layout.valid_vtree_log_path(name), log).unwrap();
            }
        }
        (dir, layout)
    }

    const VTREE_LOG: &str = "Vtree Time    1.500s\nTotal Time    1.600s\n";

    #[tokio::test]
    async fn records_and_reports_with_delay_window() {
        let (_dir, layout) = bench_dir(&[("a.cnf", Some(VTREE_LOG))]);
        fs::write(layout.nnf_path("a.cnf"), "nnf").unwrap();
        fs::write(layout.root.join("perf.data"), "data").unwrap();
        let config = RunConfig::default();
        let runner = RecordingRunner::succeeding();

        let summary = PerfRecordDriver::new(&layout, &config, &runner).run().await.unwrap();

        assert_eq!(summary.processed, 1);
        let calls = runner.calls();
        assert_eq!(calls.len(), 2);

        let record = &calls[0];
        assert_eq!(record.program, "perf");
        assert_eq!(
            record.args,
            vec![
                "record".to_string(),
                "--call-graph".to_string(),
                "dwarf".to_string(),
                "--delay=1500-7201500".to_string(),
                layout.compiler.display().to_string(),
                "--cnf".to_string(),
                layout.cnf_dir.join("a.cnf").display().to_string(),
                "--vtree_method".to_string(),
                "4".to_string(),
            ]
        );
        assert_eq!(record.working_dir.as_deref(), Some(layout.root.as_path()));
        assert_eq!(record.output, OutputSink::File(layout.stdout_path("a.cnf")));

        let report = &calls[1];
        assert_eq!(report.args, vec!["-c", PERF_REPORT_PIPELINE]);
        assert_eq!(report.output, OutputSink::File(layout.perf_report_path("a.cnf")));

        assert!(!layout.nnf_path("a.cnf").exists());
        assert!(!layout.root.join("perf.data").exists());
    }

    #[tokio::test]
    async fn uses_precomputed_vtree_when_requested() {
        let (_dir, layout) = bench_dir(&[("a.cnf", Some(VTREE_LOG)), ("b.cnf", Some(VTREE_LOG))]);
        fs::create_dir_all(&layout.vtree_dir).unwrap();
        fs::write(layout.vtree_path("a.cnf"), "vtree").unwrap();
        let config = RunConfig {
            use_vtree_input: true,
            ..RunConfig::default()
        };
        let runner = RecordingRunner::succeeding();

        let summary = PerfRecordDriver::new(&layout, &config, &runner).run().await.unwrap();

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.skipped, 1);
        let record = &runner.calls()[0];
        let tail = &record.args[record.args.len() - 2..];
        assert_eq!(tail[0], "--vtree");
        assert_eq!(tail[1], layout.vtree_path("a.cnf").display().to_string());
    }

    #[tokio::test]
    async fn instances_without_usable_vtree_log_are_skipped() {
        let (_dir, layout) = bench_dir(&[
            ("a.cnf", None),
            ("b.cnf", Some("Compile Time 3.0s\n")),
            ("c.cnf", Some("Vtree Time ???\n")),
            ("d.cnf", Some("Vtree Time  1e20s\n")),
            ("e.cnf", Some("Vtree Time  inf\n")),
        ]);
        let config = RunConfig::default();
        let runner = RecordingRunner::succeeding();

        let summary = PerfRecordDriver::new(&layout, &config, &runner).run().await.unwrap();

        assert_eq!(summary.skipped, 5);
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_record_skips_report_and_cleanup() {
        let (_dir, layout) = bench_dir(&[("a.cnf", Some(VTREE_LOG))]);
        fs::write(layout.nnf_path("a.cnf"), "nnf").unwrap();
        let config = RunConfig::default();
        let runner = RecordingRunner::new(|_| exited(255));

        let summary = PerfRecordDriver::new(&layout, &config, &runner).run().await.unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(runner.calls().len(), 1);
        assert!(layout.nnf_path("a.cnf").exists());
    }

    #[tokio::test]
    async fn timed_out_record_moves_on_to_next_instance() {
        let (_dir, layout) = bench_dir(&[("a.cnf", Some(VTREE_LOG)), ("b.cnf", Some(VTREE_LOG))]);
        let config = RunConfig::default();
        let a_cnf = layout.cnf_dir.join("a.cnf").display().to_string();
        let runner = RecordingRunner::new(move |command| {
            if command.args.contains(&a_cnf) {
                ProcessOutcome::TimedOut
            } else {
                exited(0)
            }
        });

        let summary = PerfRecordDriver::new(&layout, &config, &runner).run().await.unwrap();

        assert_eq!(summary.timed_out, 1);
        assert_eq!(summary.processed, 1);
        // a.cnf: record only; b.cnf: record and report.
        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2].output, OutputSink::File(layout.perf_report_path("b.cnf")));
        assert!(!layout.perf_report_path("a.cnf").exists());
    }

    #[tokio::test]
    async fn rerun_with_existing_reports_runs_nothing() {
        let (_dir, layout) = bench_dir(&[("a.cnf", Some(VTREE_LOG))]);
        fs::create_dir_all(&layout.perf_report_dir).unwrap();
        fs::write(layout.perf_report_path("a.cnf"), "report").unwrap();
        let config = RunConfig::default();
        let runner = RecordingRunner::succeeding();

        let summary = PerfRecordDriver::new(&layout, &config, &runner).run().await.unwrap();

        assert_eq!(summary.skipped, 1);
        assert!(runner.calls().is_empty());
        assert_eq!(
            fs::read_to_string(layout.perf_report_path("a.cnf")).unwrap(),
            "report"
        );
    }
}
