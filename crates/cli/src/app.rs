//! Process wiring
//!
//! Resolves the command, opens the subscription, runs the watch loop as a
//! background task and tears everything down when the shutdown future fires.

use crate::config::Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use runner::{
    CommandExecutor, DesktopSink, NotificationSink, Notifier, ProcessExecutor, ResolvedCommand,
    TestRunner, TrailerClassifier,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;
use tracing::{info, warn};
use watcher::{ChangeEvent, ChangeHandler, FsSubscription, WatchLoop, WatchStats};

/// How long a run in progress may take to finish after shutdown is requested
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Runs the tests and reports the result for every write
pub struct RunOnChange {
    runner: TestRunner,
    notifier: Notifier,
}

impl RunOnChange {
    pub fn new(runner: TestRunner, notifier: Notifier) -> Self {
        Self { runner, notifier }
    }
}

#[async_trait]
impl ChangeHandler for RunOnChange {
    async fn on_write(&mut self, _event: &ChangeEvent) {
        let result = self.runner.run().await;
        self.notifier.notify(&result).await;
    }
}

/// autotest application
pub struct App {
    config: Config,
    executor: Arc<dyn CommandExecutor>,
    sink: Arc<dyn NotificationSink>,
    shutdown_grace: Duration,
}

impl App {
    /// Application running real processes and desktop notifications
    pub fn new(config: Config) -> Self {
        Self {
            config,
            executor: Arc::new(ProcessExecutor),
            sink: Arc::new(DesktopSink::detect()),
            shutdown_grace: SHUTDOWN_GRACE,
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Override [`SHUTDOWN_GRACE`]
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Watch and react until `shutdown` completes
    ///
    /// Startup failures (invalid configuration, subscription error) return
    /// immediately. If the watch backend stops on its own, that is an error too.
    /// A run still going when the grace period ends is aborted; the returned
    /// stats then count only the runs that had finished.
    pub async fn run_until<F>(self, shutdown: F) -> Result<WatchStats>
    where
        F: Future<Output = ()>,
    {
        self.config.validate().context("Invalid configuration")?;

        let command = ResolvedCommand::resolve(&self.config.command, &self.config.extra_flags);
        anyhow::ensure!(!command.is_empty(), "no command configured");
        info!(
            executable = %command.executable,
            arguments = ?command.arguments,
            "Resolved command"
        );

        let (subscription, events) =
            FsSubscription::open(&self.config.watch_path, self.config.recursive_mode())
                .context("Failed to start watching")?;

        if !self.config.notifications_enabled {
            info!("Desktop notifications disabled");
        }

        let handler = RunOnChange::new(
            TestRunner::new(command, self.executor),
            Notifier::new(
                self.config.notifications_enabled,
                Box::new(TrailerClassifier),
                self.sink,
            ),
        );

        let token = CancellationToken::new();
        let watch_loop = WatchLoop::new(events, handler, token.clone());
        let counters = watch_loop.counters();
        let mut task = tokio::spawn(watch_loop.run().with_current_subscriber());

        tokio::select! {
            _ = shutdown => {
                info!("Shutdown requested");
            }
            joined = &mut task => {
                let stats = joined.context("Watch loop task failed")?;
                anyhow::bail!("Watch loop stopped unexpectedly after {} runs", stats.runs);
            }
        }

        token.cancel();
        let stats = match tokio::time::timeout(self.shutdown_grace, &mut task).await {
            Ok(joined) => joined.context("Watch loop task failed")?,
            Err(_) => {
                warn!("Run still in progress after {:?}, aborting it", self.shutdown_grace);
                task.abort();
                counters.snapshot()
            }
        };

        if let Err(e) = subscription.close() {
            warn!("Failed to close subscription: {}", e);
        }

        info!(
            events = stats.events,
            runs = stats.runs,
            errors = stats.errors,
            "Stopped watching"
        );
        Ok(stats)
    }
}
