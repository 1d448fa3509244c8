//! Filesystem subscription
//!
//! Wraps a `notify` watcher whose callback thread forwards change events and
//! backend errors into an unbounded tokio channel. The subscription owns the
//! watcher: dropping it (or calling [`FsSubscription::close`]) stops delivery
//! and closes the channel.

use crate::event::ChangeEvent;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from the watch backend
#[derive(Debug, Error)]
pub enum WatchError {
    /// Subscription could not be established (missing path, permissions, ...)
    #[error("failed to watch {path}: {source}")]
    Subscribe {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// Error reported by the backend while watching
    #[error("watch error: {0}")]
    Backend(#[from] notify::Error),
}

/// One item from the subscription stream
pub type WatchMessage = Result<ChangeEvent, WatchError>;

/// Live filesystem subscription rooted at one path
pub struct FsSubscription {
    root: PathBuf,
    watcher: RecommendedWatcher,
}

impl FsSubscription {
    /// Subscribe to changes under `root`
    ///
    /// With [`RecursiveMode::NonRecursive`] only the directory's direct entries
    /// are watched. Returns the subscription guard and the receiving end of
    /// its event stream.
    pub fn open(
        root: &Path,
        mode: RecursiveMode,
    ) -> Result<(Self, mpsc::UnboundedReceiver<WatchMessage>), WatchError> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    for change in ChangeEvent::from_notify(event) {
                        // Receiver gone means the loop has shut down
                        let _ = tx.send(Ok(change));
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(WatchError::Backend(e)));
                }
            }
        })
        .map_err(|source| WatchError::Subscribe {
            path: root.to_path_buf(),
            source,
        })?;

        watcher
            .watch(root, mode)
            .map_err(|source| WatchError::Subscribe {
                path: root.to_path_buf(),
                source,
            })?;

        tracing::info!(path = %root.display(), ?mode, "Watching for changes");

        Ok((
            Self {
                root: root.to_path_buf(),
                watcher,
            },
            rx,
        ))
    }

    /// Watched root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop watching and release the backend
    ///
    /// The event channel closes once the backend is dropped.
    pub fn close(mut self) -> Result<(), WatchError> {
        self.watcher.unwatch(&self.root)?;
        tracing::debug!(path = %self.root.display(), "Stopped watching");
        Ok(())
    }
}
