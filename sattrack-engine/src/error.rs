//! Error types for the tracking engine

use sattrack_common::{Topic, ViewKind};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for tracking engine operations
pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Error, Debug)]
pub enum TrackerError {
    /// A view was registered twice at startup
    #[error("View '{0}' is already registered")]
    DuplicateView(ViewKind),

    /// Activation of a view that was never registered
    #[error("View '{0}' is not registered")]
    UnknownView(ViewKind),

    /// Positions were requested before the observer location was known
    #[error("No observer location is available yet")]
    NoObserver,

    /// A subscriber failed while an event was being published; the
    /// remaining subscribers for that publish were not called
    #[error("Handler #{index} for '{topic}' failed: {source}")]
    HandlerFault {
        topic: Topic,
        index: usize,
        #[source]
        source: Box<TrackerError>,
    },

    #[error("Propagation failed for {satellite}: {reason}")]
    Propagation { satellite: String, reason: String },

    #[error("Invalid element set {path:?}: {reason}")]
    ElementSet { path: PathBuf, reason: String },

    /// The calculation loop can only be started from inside a tokio runtime
    #[error("No async runtime available to drive the calculation loop")]
    NoRuntime,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TrackerError {
    /// Follows nested handler faults down to the error that started them
    pub fn root_cause(&self) -> &TrackerError {
        match self {
            TrackerError::HandlerFault { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
