//! Desktop notification of run results
//!
//! The [`Notifier`] formats a [`RunResult`] into a [`NotificationPayload`] and
//! hands it to a [`NotificationSink`]. [`DesktopSink`] shells out to the
//! platform notifier (`osascript` on macOS, `notify-send` elsewhere).

use crate::classify::OutcomeClassifier;
use crate::exec::RunResult;
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// Title used for execution failures and unreadable output
pub const ERROR_TITLE: &str = "ERROR";

/// Notification sound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sound {
    /// Platform default alert sound
    Default,
    /// Silent
    None,
}

/// What gets shown on the desktop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub sound: Sound,
}

/// Errors from pushing a notification
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The notifier program could not be started
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The notifier program reported failure
    #[error("{program} failed ({status}): {stderr}")]
    Backend {
        program: &'static str,
        status: std::process::ExitStatus,
        stderr: String,
    },

    /// No desktop notifier is known for this platform
    #[error("desktop notifications are not supported on {0}")]
    Unsupported(&'static str),
}

/// Capability that displays a notification
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn push(&self, payload: &NotificationPayload) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    AppleScript,
    NotifySend,
    Unsupported,
}

/// Pushes notifications through the platform's notifier program
#[derive(Debug, Clone)]
pub struct DesktopSink {
    backend: Backend,
}

impl DesktopSink {
    /// Application name shown by notification daemons
    pub const APP_NAME: &'static str = "autotest";

    /// Pick the notifier for the current platform
    pub fn detect() -> Self {
        let backend = if cfg!(target_os = "macos") {
            Backend::AppleScript
        } else if cfg!(unix) {
            Backend::NotifySend
        } else {
            Backend::Unsupported
        };
        Self { backend }
    }

    fn command(&self, payload: &NotificationPayload) -> Result<(&'static str, Command), NotifyError> {
        match self.backend {
            Backend::AppleScript => {
                let mut cmd = Command::new("osascript");
                cmd.arg("-e").arg(apple_script(payload));
                Ok(("osascript", cmd))
            }
            Backend::NotifySend => {
                let mut cmd = Command::new("notify-send");
                cmd.arg("--app-name").arg(Self::APP_NAME);
                if payload.sound == Sound::Default {
                    cmd.arg("--hint").arg("string:sound-name:message-new-instant");
                }
                // notify-send refuses an empty summary
                let summary = if payload.title.is_empty() {
                    Self::APP_NAME
                } else {
                    payload.title.as_str()
                };
                cmd.arg(summary).arg(&payload.body);
                Ok(("notify-send", cmd))
            }
            Backend::Unsupported => Err(NotifyError::Unsupported(std::env::consts::OS)),
        }
    }
}

#[async_trait]
impl NotificationSink for DesktopSink {
    async fn push(&self, payload: &NotificationPayload) -> Result<(), NotifyError> {
        let (program, mut cmd) = self.command(payload)?;

        let output = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| NotifyError::Spawn { program, source })?;

        if !output.status.success() {
            return Err(NotifyError::Backend {
                program,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

fn apple_script(payload: &NotificationPayload) -> String {
    let mut script = format!(
        "display notification \"{}\" with title \"{}\"",
        escape_apple_string(&payload.body),
        escape_apple_string(&payload.title),
    );
    if payload.sound == Sound::Default {
        script.push_str(" sound name \"default\"");
    }
    script
}

fn escape_apple_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Formats run results and pushes them to a sink
pub struct Notifier {
    enabled: bool,
    classifier: Box<dyn OutcomeClassifier>,
    sink: Arc<dyn NotificationSink>,
}

impl Notifier {
    pub fn new(
        enabled: bool,
        classifier: Box<dyn OutcomeClassifier>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            enabled,
            classifier,
            sink,
        }
    }

    /// Build the payload for a run result
    ///
    /// Failed runs show `ERROR` and the execution error verbatim. Successful
    /// runs go through the classifier; output the classifier cannot read is
    /// also reported under `ERROR`.
    pub fn compose(&self, result: &RunResult) -> NotificationPayload {
        let (title, body) = if !result.succeeded {
            (
                ERROR_TITLE.to_string(),
                result.error_detail.clone().unwrap_or_default(),
            )
        } else {
            match self.classifier.classify(&result.captured_stdout) {
                Ok(outcome) => (outcome.title, outcome.summary),
                Err(e) => (ERROR_TITLE.to_string(), e.to_string()),
            }
        };

        NotificationPayload {
            title,
            body,
            sound: Sound::Default,
        }
    }

    /// Compose and dispatch a notification for `result`
    ///
    /// Returns the payload that was pushed, or `None` when notifications are
    /// disabled. A failed push is logged and otherwise ignored.
    pub async fn notify(&self, result: &RunResult) -> Option<NotificationPayload> {
        if !self.enabled {
            return None;
        }

        let payload = self.compose(result);
        debug!(title = %payload.title, body = %payload.body, "Pushing notification");

        if let Err(e) = self.sink.push(&payload).await {
            warn!("Failed to push notification: {}", e);
        }

        Some(payload)
    }
}
