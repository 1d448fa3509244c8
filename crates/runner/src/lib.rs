//! Command execution and result reporting for autotest
//!
//! This crate provides:
//! - Command resolution (`"go test"` + flags into executable and arguments)
//! - The test runner that executes a resolved command and captures stdout
//! - Outcome classification of captured output
//! - Desktop notification of run results

pub mod classify;
pub mod command;
pub mod exec;
pub mod notify;

// Re-exports
pub use classify::{ClassifyError, Outcome, OutcomeClassifier, TrailerClassifier};
pub use command::ResolvedCommand;
pub use exec::{CommandExecutor, ExecError, ProcessExecutor, RunResult, TestRunner};
pub use notify::{DesktopSink, NotificationPayload, NotificationSink, Notifier, NotifyError, Sound};
