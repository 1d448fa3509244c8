//! Watch loop
//!
//! Consumes the subscription stream and calls the handler for every write,
//! inline. While the handler runs, further events wait in the channel; nothing
//! is debounced, coalesced or dropped.

use crate::event::ChangeEvent;
use crate::subscription::WatchMessage;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Reacts to file writes
#[async_trait]
pub trait ChangeHandler: Send {
    /// Called once per write event; the loop waits for it to return
    async fn on_write(&mut self, event: &ChangeEvent);
}

/// Counters reported when the loop exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchStats {
    /// Change events received, of any kind
    pub events: u64,
    /// Handler invocations
    pub runs: u64,
    /// Subscription errors received
    pub errors: u64,
}

/// Live counters, readable while the loop runs and after it is aborted
#[derive(Debug, Default)]
pub struct WatchCounters {
    events: AtomicU64,
    runs: AtomicU64,
    errors: AtomicU64,
}

impl WatchCounters {
    pub fn snapshot(&self) -> WatchStats {
        WatchStats {
            events: self.events.load(Ordering::Relaxed),
            runs: self.runs.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Single-flight event loop
pub struct WatchLoop<H> {
    events: mpsc::UnboundedReceiver<WatchMessage>,
    handler: H,
    shutdown: CancellationToken,
    counters: Arc<WatchCounters>,
}

impl<H: ChangeHandler> WatchLoop<H> {
    pub fn new(
        events: mpsc::UnboundedReceiver<WatchMessage>,
        handler: H,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            events,
            handler,
            shutdown,
            counters: Arc::default(),
        }
    }

    /// Shared handle on this loop's counters
    pub fn counters(&self) -> Arc<WatchCounters> {
        Arc::clone(&self.counters)
    }

    /// Run until `shutdown` is cancelled or the event stream ends
    ///
    /// Cancellation is observed between events; a handler call in progress is
    /// allowed to finish. A run counts once its handler call has returned.
    pub async fn run(mut self) -> WatchStats {
        loop {
            let msg = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("Watch loop shutting down");
                    break;
                }
                msg = self.events.recv() => msg,
            };

            match msg {
                Some(Ok(event)) => {
                    self.counters.events.fetch_add(1, Ordering::Relaxed);
                    if event.is_write() {
                        info!(path = %event.path.display(), "Modified file");
                        self.handler.on_write(&event).await;
                        self.counters.runs.fetch_add(1, Ordering::Relaxed);
                    } else {
                        debug!(path = %event.path.display(), kind = ?event.kind, "Ignoring change");
                    }
                }
                Some(Err(e)) => {
                    self.counters.errors.fetch_add(1, Ordering::Relaxed);
                    warn!("{}", e);
                }
                None => {
                    warn!("Event stream closed, stopping watch loop");
                    break;
                }
            }
        }

        let stats = self.counters.snapshot();
        debug!(?stats, "Watch loop finished");
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::OperationKind;
    use crate::subscription::WatchError;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct CountingHandler {
        calls: Arc<AtomicUsize>,
        in_flight: Arc<AtomicUsize>,
        max_in_flight: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ChangeHandler for CountingHandler {
        async fn on_write(&mut self, _event: &ChangeEvent) {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn write(path: &str) -> WatchMessage {
        Ok(ChangeEvent::new(path, OperationKind::Write))
    }

    fn other(path: &str) -> WatchMessage {
        Ok(ChangeEvent::new(path, OperationKind::Other))
    }

    async fn run_with(messages: Vec<WatchMessage>) -> (WatchStats, CountingHandler) {
        let (tx, rx) = mpsc::unbounded_channel();
        for msg in messages {
            tx.send(msg).unwrap();
        }
        drop(tx);

        let handler = CountingHandler::default();
        let stats = WatchLoop::new(rx, handler.clone(), CancellationToken::new())
            .run()
            .await;
        (stats, handler)
    }

    #[tokio::test]
    async fn test_single_write_runs_once() {
        let (stats, handler) = run_with(vec![write("main.go")]).await;

        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        assert_eq!(stats, WatchStats { events: 1, runs: 1, errors: 0 });
    }

    #[tokio::test]
    async fn test_non_write_runs_nothing() {
        let (stats, handler) = run_with(vec![other("old.go"), other("new.go")]).await;

        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
        assert_eq!(stats.events, 2);
        assert_eq!(stats.runs, 0);
    }

    #[tokio::test]
    async fn test_repeated_writes_are_not_deduplicated() {
        let (stats, handler) = run_with(vec![write("main.go"), write("main.go")]).await;

        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
        assert_eq!(stats.runs, 2);
    }

    #[tokio::test]
    async fn test_runs_never_overlap() {
        let messages = (0..5).map(|_| write("main.go")).collect();
        let (_, handler) = run_with(messages).await;

        assert_eq!(handler.calls.load(Ordering::SeqCst), 5);
        assert_eq!(handler.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_errors_do_not_stop_the_loop() {
        let backend_error = WatchError::Backend(notify::Error::generic("queue overflow"));
        let (stats, handler) =
            run_with(vec![Err(backend_error), write("main.go")]).await;

        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        assert_eq!(stats, WatchStats { events: 1, runs: 1, errors: 1 });
    }

    #[tokio::test]
    async fn test_cancellation_stops_the_loop() {
        let (tx, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let handler = CountingHandler::default();

        let watch_loop = WatchLoop::new(rx, handler.clone(), token.clone());
        let counters = watch_loop.counters();
        let task = tokio::spawn(watch_loop.run());

        tx.send(write("main.go")).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();

        let stats = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("loop did not stop after cancellation")
            .unwrap();

        assert_eq!(stats.runs, 1);
        assert_eq!(counters.snapshot(), stats);
        drop(tx);
    }
}
