//! File system watching for autotest
//!
//! This crate provides:
//! - Change events reduced to "write" vs "other"
//! - A scoped `notify` subscription feeding a tokio channel
//! - The watch loop that reacts to each write, one at a time

pub mod event;
pub mod subscription;
pub mod watch_loop;

// Re-exports
pub use event::{ChangeEvent, OperationKind};
pub use notify::RecursiveMode;
pub use subscription::{FsSubscription, WatchError, WatchMessage};
pub use watch_loop::{ChangeHandler, WatchCounters, WatchLoop, WatchStats};
