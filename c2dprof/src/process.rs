//! Launching external tools.

use crate::{DriverError, Result, at_path};
use async_trait::async_trait;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Where a process's output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSink {
    /// Keep stdout and stderr in memory.
    Capture,
    /// Write stdout and stderr, interleaved, to a file (truncated first).
    File(PathBuf),
}

/// A fully described external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub output: OutputSink,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            timeout: None,
            output: OutputSink::Capture,
        }
    }

    /// Run `command_line` through `sh -c`, for pipelines.
    pub fn shell(command_line: impl Into<String>) -> Self {
        Self::new("sh").arg("-c").arg(command_line)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.display().to_string())
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn output_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = OutputSink::File(path.into());
        self
    }

    /// The command as it would be typed in a shell, for logging.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How an external process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Exited {
        /// `None` when the process was killed by a signal.
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    /// The time limit elapsed and the process was killed.
    TimedOut,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        matches!(self, ProcessOutcome::Exited { code: Some(0), .. })
    }
}

/// Capability to run external processes, one at a time.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `command` to completion or until its timeout.
    ///
    /// Only failures to start the process are errors; a non-zero exit or a
    /// timeout is reported through [`ProcessOutcome`].
    async fn run(&self, command: &CommandSpec) -> Result<ProcessOutcome>;
}

/// Runs commands as child processes on the tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioRunner;

#[async_trait]
impl ProcessRunner for TokioRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<ProcessOutcome> {
        let mut cmd = Command::new(&spec.program);
        // Own process group, so a timeout also reaches the processes the
        // command starts (`perf.sh`, pipelines, `perf record <compiler>`).
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .process_group(0)
            .kill_on_drop(true);
        if let Some(dir) = &spec.working_dir {
            cmd.current_dir(dir);
        }
        match &spec.output {
            OutputSink::Capture => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
            }
            OutputSink::File(path) => {
                let file = File::create(path).map_err(at_path(path))?;
                let err_file = file.try_clone().map_err(at_path(path))?;
                cmd.stdout(Stdio::from(file)).stderr(Stdio::from(err_file));
            }
        }

        let child = cmd.spawn().map_err(|source| DriverError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        let pid = child.id();
        let mut wait = std::pin::pin!(child.wait_with_output());
        let output = match spec.timeout {
            Some(limit) => match tokio::time::timeout(limit, wait.as_mut()).await {
                Ok(output) => output?,
                Err(_) => {
                    kill_process_group(pid);
                    if let Err(e) = wait.await {
                        debug!("Failed to reap '{}' after timeout: {}", spec.program, e);
                    }
                    return Ok(ProcessOutcome::TimedOut);
                }
            },
            None => wait.await?,
        };

        Ok(ProcessOutcome::Exited {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// SIGKILL every process in the group led by `pid`.
fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid else {
        return;
    };
    // SAFETY: killpg only sends a signal and touches no memory.
    let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
    if rc != 0 {
        warn!(
            "Failed to kill process group {}: {}",
            pid,
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_arguments() {
        let spec = CommandSpec::new("miniC2D")
            .arg("--cnf")
            .path_arg(Path::new("cnfs/a.cnf"))
            .timeout(Some(Duration::from_secs(5)))
            .output_to("log.txt");

        assert_eq!(spec.args, vec!["--cnf", "cnfs/a.cnf"]);
        assert_eq!(spec.timeout, Some(Duration::from_secs(5)));
        assert_eq!(spec.output, OutputSink::File(PathBuf::from("log.txt")));
        assert_eq!(spec.display(), "miniC2D --cnf cnfs/a.cnf");
    }

    #[test]
    fn shell_wraps_pipeline() {
        let spec = CommandSpec::shell("perf report --stdio | c++filt");
        assert_eq!(spec.program, "sh");
        assert_eq!(spec.args, vec!["-c", "perf report --stdio | c++filt"]);
    }

    #[tokio::test]
    async fn tokio_runner_captures_output() {
        let spec = CommandSpec::shell("echo out; echo err >&2; exit 3");
        let outcome = TokioRunner.run(&spec).await.unwrap();

        assert_eq!(
            outcome,
            ProcessOutcome::Exited {
                code: Some(3),
                stdout: "out\n".to_string(),
                stderr: "err\n".to_string(),
            }
        );
        assert!(!outcome.success());
    }

    #[tokio::test]
    async fn tokio_runner_writes_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("run.log");
        let spec = CommandSpec::shell("echo hello").output_to(&log);

        let outcome = TokioRunner.run(&spec).await.unwrap();

        assert!(outcome.success());
        assert_eq!(std::fs::read_to_string(&log).unwrap(), "hello\n");
    }

    #[tokio::test]
    async fn tokio_runner_times_out() {
        let spec = CommandSpec::new("sleep")
            .arg("5")
            .timeout(Some(Duration::from_millis(50)));

        let outcome = TokioRunner.run(&spec).await.unwrap();
        assert_eq!(outcome, ProcessOutcome::TimedOut);
    }

    #[tokio::test]
    async fn timeout_kills_background_children() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let spec = CommandSpec::shell(format!(
            "sh -c 'sleep 1; touch {}'; true",
            marker.display()
        ))
        .timeout(Some(Duration::from_millis(100)));

        let outcome = TokioRunner.run(&spec).await.unwrap();
        assert_eq!(outcome, ProcessOutcome::TimedOut);

        tokio::time::sleep(Duration::from_millis(1800)).await;
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let spec = CommandSpec::new("/nonexistent/miniC2D");
        let result = TokioRunner.run(&spec).await;

        assert!(matches!(result, Err(DriverError::Spawn { .. })));
    }
}
