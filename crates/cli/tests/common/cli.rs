//! CLI command execution helpers with automatic timing
//!
//! This module wraps the `autotest` binary: one-shot invocations that are
//! expected to exit, and long-running watchers whose stderr log is streamed
//! back line by line.

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// Path of the binary under test
pub fn autotest_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_autotest"))
}

/// CLI command builder with timing
pub struct AutotestCommand {
    working_dir: PathBuf,
    args: Vec<String>,
}

impl AutotestCommand {
    /// Create a new command in the given working directory
    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            args: Vec::new(),
        }
    }

    /// Add command arguments
    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(autotest_binary());
        command
            .args(&self.args)
            .current_dir(&self.working_dir)
            .env_remove("RUST_LOG")
            .stdin(Stdio::null());
        command
    }

    /// Execute command to completion and return result with timing
    pub fn execute(&self) -> Result<CommandResult> {
        let start = Instant::now();

        let output = self
            .command()
            .output()
            .context("Failed to execute command")?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            duration: start.elapsed(),
        })
    }

    /// Execute and assert success
    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if !result.success() {
            anyhow::bail!(
                "Command failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
                result.exit_code,
                self.args,
                result.stdout,
                result.stderr
            );
        }

        Ok(result)
    }

    /// Execute and expect failure
    pub fn assert_failure(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if result.success() {
            anyhow::bail!(
                "Command should have failed but succeeded:\nArgs: {:?}\nStderr: {}",
                self.args,
                result.stderr
            );
        }

        Ok(result)
    }

    /// Start a long-running watcher, streaming its stderr
    pub fn spawn(&self) -> Result<RunningAutotest> {
        let mut child = self
            .command()
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn command")?;

        let stderr = child.stderr.take().context("stderr not captured")?;
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for line in BufReader::new(stderr).lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        Ok(RunningAutotest {
            child,
            lines: rx,
            seen: Vec::new(),
        })
    }
}

/// Command execution result with timing
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl CommandResult {
    /// Check if command succeeded
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Check if stdout contains text
    pub fn contains_stdout(&self, text: &str) -> bool {
        self.stdout.contains(text)
    }

    /// Check if stderr contains text
    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }
}

/// A watcher process started by [`AutotestCommand::spawn`]
pub struct RunningAutotest {
    child: Child,
    lines: mpsc::Receiver<String>,
    seen: Vec<String>,
}

impl RunningAutotest {
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Block until a log line containing `text` appears
    pub fn wait_for_log(&mut self, text: &str, timeout: Duration) -> Result<String> {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.lines.recv_timeout(remaining) {
                Ok(line) => {
                    self.seen.push(line.clone());
                    if line.contains(text) {
                        return Ok(line);
                    }
                }
                Err(_) => anyhow::bail!(
                    "Log line containing {:?} not seen within {:?}. Log so far:\n{}",
                    text,
                    timeout,
                    self.seen.join("\n")
                ),
            }
        }
    }

    /// Lines that contain `text` among those read so far
    pub fn count_seen(&self, text: &str) -> usize {
        self.seen.iter().filter(|line| line.contains(text)).count()
    }

    /// Wait for the process to exit on its own
    pub fn wait_exit(&mut self, timeout: Duration) -> Result<i32> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(status) = self.child.try_wait()? {
                return Ok(status.code().unwrap_or(-1));
            }
            if Instant::now() >= deadline {
                anyhow::bail!("Process did not exit within {:?}", timeout);
            }
            thread::sleep(Duration::from_millis(20));
        }
    }
}

impl Drop for RunningAutotest {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Macro for convenient command construction
///
/// Usage:
/// ```
/// autotest!(dir, "--path", ".", "--skip-notify").spawn()?;
/// ```
#[macro_export]
macro_rules! autotest {
    ($dir:expr, $($arg:expr),*) => {{
        let mut cmd = $crate::common::cli::AutotestCommand::new($dir);
        cmd.args(&[$($arg),*]);
        cmd
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_result_matching() {
        let result = CommandResult {
            stdout: "autotest 0.1.0\n".to_string(),
            stderr: "ERROR watch path does not exist: missing\n".to_string(),
            exit_code: 1,
            duration: Duration::from_millis(10),
        };

        assert!(!result.success());
        assert!(result.contains_stdout("0.1.0"));
        assert!(result.contains_stderr("does not exist"));
    }
}
