//! Test execution
//!
//! Runs the resolved command to completion, capturing stdout. Standard error is
//! discarded; only the execution's own failure (spawn error, non-zero exit) is
//! reported back as an error.

use crate::command::ResolvedCommand;
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::process::Command;
use tracing::{error, info};

/// Errors from executing a command
#[derive(Debug, Error)]
pub enum ExecError {
    /// The program could not be started (not found, not executable, ...)
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran and exited with a failure status
    #[error("exit status {code}")]
    ExitStatus { code: i32 },

    /// The program was terminated without an exit code
    #[error("terminated by signal")]
    Signal,

    /// Reading the program's output failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecError {
    fn from_status(status: ExitStatus) -> Option<Self> {
        if status.success() {
            return None;
        }
        Some(match status.code() {
            Some(code) => ExecError::ExitStatus { code },
            None => ExecError::Signal,
        })
    }
}

/// Capability that runs a command and yields its captured stdout
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run the command to completion
    ///
    /// Returns whatever was captured on stdout together with the execution
    /// error, if any. Output is returned even when the run failed.
    async fn execute(&self, command: &ResolvedCommand) -> (String, Option<ExecError>);
}

/// Executes commands as child processes of autotest
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor;

#[async_trait]
impl CommandExecutor for ProcessExecutor {
    async fn execute(&self, command: &ResolvedCommand) -> (String, Option<ExecError>) {
        let child = Command::new(&command.executable)
            .args(&command.arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            // Dropping the run (e.g. on shutdown) must not leave the child behind
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(source) => {
                return (
                    String::new(),
                    Some(ExecError::Spawn {
                        program: command.executable.clone(),
                        source,
                    }),
                )
            }
        };

        match child.wait_with_output().await {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                (stdout, ExecError::from_status(output.status))
            }
            Err(e) => (String::new(), Some(ExecError::Io(e))),
        }
    }
}

/// Outcome of a single test run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// True when the command completed without an execution error
    pub succeeded: bool,
    /// Everything the command wrote to stdout
    pub captured_stdout: String,
    /// Execution error message, set only when `succeeded` is false
    pub error_detail: Option<String>,
}

impl RunResult {
    /// Run completed; output is not interpreted here
    pub fn success(captured_stdout: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            captured_stdout: captured_stdout.into(),
            error_detail: None,
        }
    }

    /// Run failed to start or exited with a failure status
    pub fn failure(captured_stdout: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            captured_stdout: captured_stdout.into(),
            error_detail: Some(detail.into()),
        }
    }
}

/// Runs the configured command on demand
pub struct TestRunner {
    command: ResolvedCommand,
    executor: Arc<dyn CommandExecutor>,
}

impl TestRunner {
    /// Create a runner for `command` using `executor`
    pub fn new(command: ResolvedCommand, executor: Arc<dyn CommandExecutor>) -> Self {
        Self { command, executor }
    }

    /// Execute the command once and classify the execution
    ///
    /// Output text is not inspected: a command printing `FAIL` but exiting 0 is
    /// still a successful run at this layer.
    pub async fn run(&self) -> RunResult {
        let started = Instant::now();
        let (stdout, err) = self.executor.execute(&self.command).await;
        let elapsed = started.elapsed();

        match err {
            None => {
                info!(command = %self.command, ?elapsed, "Run finished");
                RunResult::success(stdout)
            }
            Some(e) => {
                error!(command = %self.command, ?elapsed, "Run failed: {}", e);
                RunResult::failure(stdout, e.to_string())
            }
        }
    }
}
