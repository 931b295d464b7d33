//! Test doubles for the process runner.

use crate::Result;
use crate::process::{CommandSpec, OutputSink, ProcessOutcome, ProcessRunner};
use async_trait::async_trait;
use std::sync::Mutex;

type Behavior = Box<dyn Fn(&CommandSpec) -> ProcessOutcome + Send + Sync>;

/// Records every command and answers with a scripted outcome.
pub struct RecordingRunner {
    calls: Mutex<Vec<CommandSpec>>,
    behavior: Behavior,
}

impl RecordingRunner {
    pub fn new(behavior: impl Fn(&CommandSpec) -> ProcessOutcome + Send + Sync + 'static) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            behavior: Box::new(behavior),
        }
    }

    /// Every command exits with status 0 and prints nothing.
    pub fn succeeding() -> Self {
        Self::new(|_| exited(0))
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessRunner for RecordingRunner {
    async fn run(&self, command: &CommandSpec) -> Result<ProcessOutcome> {
        self.calls.lock().unwrap().push(command.clone());
        if let OutputSink::File(path) = &command.output {
            std::fs::write(path, "")?;
        }
        Ok((self.behavior)(command))
    }
}

pub fn exited(code: i32) -> ProcessOutcome {
    ProcessOutcome::Exited {
        code: Some(code),
        stdout: String::new(),
        stderr: String::new(),
    }
}
