//! Batch vtree generation.
//!
//! For every instance without a vtree, runs
//! `miniC2D --cnf <cnf> --vtree_out <vtree> --vtree_method <m>` and keeps the
//! console output in `vtree_logs/<name>.log`. Those logs later provide the
//! `Vtree Time` that [`crate::record`] uses to delay sampling.

use crate::config::{Layout, RunConfig};
use crate::process::{CommandSpec, ProcessOutcome, ProcessRunner};
use crate::processed::{OutputExists, ProcessedCheck, list_cnfs};
use crate::{BatchSummary, Result, at_path};
use std::fs;
use tracing::{info, warn};

pub struct VtreeDriver<'a> {
    layout: &'a Layout,
    config: &'a RunConfig,
    runner: &'a dyn ProcessRunner,
    processed: Box<dyn ProcessedCheck + 'a>,
}

impl<'a> VtreeDriver<'a> {
    /// Driver treating an instance as done once its vtree file exists.
    pub fn new(layout: &'a Layout, config: &'a RunConfig, runner: &'a dyn ProcessRunner) -> Self {
        Self {
            layout,
            config,
            runner,
            processed: Box::new(OutputExists::new(&layout.vtree_dir, ".vtree")),
        }
    }

    pub fn with_check(mut self, check: impl ProcessedCheck + 'a) -> Self {
        self.processed = Box::new(check);
        self
    }

    pub async fn run(&self) -> Result<BatchSummary> {
        let layout = self.layout;
        fs::create_dir_all(&layout.vtree_dir).map_err(at_path(&layout.vtree_dir))?;
        fs::create_dir_all(&layout.vtree_log_dir).map_err(at_path(&layout.vtree_log_dir))?;

        let mut summary = BatchSummary::default();
        for cnf in list_cnfs(&layout.cnf_dir)? {
            if self.processed.is_already_processed(&cnf.name) {
                info!("Skipping {} (vtree already exists)", cnf.name);
                summary.skipped += 1;
                continue;
            }

            let command = CommandSpec::new(layout.compiler.display().to_string())
                .arg("--cnf")
                .path_arg(&cnf.path)
                .arg("--vtree_out")
                .path_arg(&layout.vtree_path(&cnf.name))
                .arg("--vtree_method")
                .arg(self.config.vtree_method.to_string())
                .working_dir(&layout.root)
                .timeout(self.config.timeout)
                .output_to(layout.vtree_log_path(&cnf.name));

            info!("Processing {}...", cnf.name);
            match self.runner.run(&command).await? {
                ProcessOutcome::TimedOut => {
                    warn!(
                        "Timeout expired for {} after {:?}",
                        cnf.name,
                        self.config.timeout.unwrap_or_default()
                    );
                    summary.timed_out += 1;
                }
                ProcessOutcome::Exited { code: Some(0), .. } => {
                    info!("Successfully processed {}", cnf.name);
                    summary.processed += 1;
                }
                ProcessOutcome::Exited { code, .. } => {
                    warn!("Error processing {} (exit code: {:?})", cnf.name, code);
                    summary.failed += 1;
                }
            }
        }

        info!("Vtree generation finished: {summary}");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::OutputSink;
    use crate::testing::{RecordingRunner, exited};
    use std::path::Path;

    fn bench_dir(cnfs: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("cnfs")).unwrap();
        for name in cnfs {
            fs::write(dir.path().join("cnfs").join(name), "p cnf 1 1\n1 0\n").unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn runs_compiler_for_each_instance() {
        let dir = bench_dir(&["a.cnf", "b.cnf"]);
        let layout = Layout::rooted(dir.path());
        let config = RunConfig::default();
        let runner = RecordingRunner::succeeding();

        let summary = VtreeDriver::new(&layout, &config, &runner).run().await.unwrap();

        assert_eq!(summary.processed, 2);
        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].program, layout.compiler.display().to_string());
        assert_eq!(
            calls[0].args,
            vec![
                "--cnf".to_string(),
                layout.cnf_dir.join("a.cnf").display().to_string(),
                "--vtree_out".to_string(),
                layout.vtree_path("a.cnf").display().to_string(),
                "--vtree_method".to_string(),
                "4".to_string(),
            ]
        );
        assert_eq!(calls[0].timeout, config.timeout);
        assert_eq!(calls[0].output, OutputSink::File(layout.vtree_log_path("a.cnf")));
        assert!(layout.vtree_log_path("b.cnf").exists());
    }

    #[tokio::test]
    async fn existing_vtrees_are_skipped() {
        let dir = bench_dir(&["a.cnf", "b.cnf"]);
        let layout = Layout::rooted(dir.path());
        fs::create_dir(&layout.vtree_dir).unwrap();
        fs::write(layout.vtree_path("a.cnf"), "vtree 1\n").unwrap();
        let config = RunConfig::default();
        let runner = RecordingRunner::succeeding();

        let summary = VtreeDriver::new(&layout, &config, &runner).run().await.unwrap();

        assert_eq!(summary.skipped, 1);
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].args.contains(&layout.cnf_dir.join("b.cnf").display().to_string()));
    }

    #[tokio::test]
    async fn injected_check_skips_everything() {
        let dir = bench_dir(&["a.cnf", "b.cnf"]);
        let layout = Layout::rooted(dir.path());
        let config = RunConfig::default();
        let runner = RecordingRunner::succeeding();

        let summary = VtreeDriver::new(&layout, &config, &runner)
            .with_check(|_: &str| true)
            .run()
            .await
            .unwrap();

        assert_eq!(summary.skipped, 2);
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn failures_and_timeouts_do_not_stop_the_batch() {
        let dir = bench_dir(&["a.cnf", "b.cnf", "c.cnf"]);
        let layout = Layout::rooted(dir.path());
        let config = RunConfig::default();
        let runner = RecordingRunner::new(|command| {
            let cnf = Path::new(&command.args[1]);
            match cnf.file_name().and_then(|n| n.to_str()) {
                Some("a.cnf") => ProcessOutcome::TimedOut,
                Some("b.cnf") => exited(1),
                _ => exited(0),
            }
        });

        let summary = VtreeDriver::new(&layout, &config, &runner).run().await.unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                processed: 1,
                skipped: 0,
                failed: 1,
                timed_out: 1,
            }
        );
    }
}
