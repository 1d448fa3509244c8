//! Change events
//!
//! `notify` reports a rich event taxonomy; autotest only cares whether a file's
//! contents were written.

use notify::event::{EventKind, ModifyKind};
use std::path::PathBuf;

/// Kind of change, as far as autotest is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// File contents were written
    Write,
    /// Create, remove, rename, metadata change, access, ...
    Other,
}

impl From<&EventKind> for OperationKind {
    fn from(kind: &EventKind) -> Self {
        match kind {
            // Some backends only report an unspecified modify for writes
            EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
                OperationKind::Write
            }
            _ => OperationKind::Other,
        }
    }
}

/// A watched path changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Path that changed
    pub path: PathBuf,
    /// Type of change
    pub kind: OperationKind,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: OperationKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn is_write(&self) -> bool {
        self.kind == OperationKind::Write
    }

    /// Split a backend event into one change per affected path
    pub fn from_notify(event: notify::Event) -> Vec<ChangeEvent> {
        let kind = OperationKind::from(&event.kind);
        event
            .paths
            .into_iter()
            .map(|path| ChangeEvent { path, kind })
            .collect()
    }
}
