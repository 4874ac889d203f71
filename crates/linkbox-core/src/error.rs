//! Store error handling
//!
//! Every I/O boundary of a synchronized file returns one of these errors.
//! The variants follow the three failure points of a file round-trip
//! (read, parse, write) plus the two ways a store can be misused or fail
//! to observe its file.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`StoreError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Read,
    Parse,
    Write,
    NoPath,
    Watch,
}

/// Errors that can occur while loading, saving or watching a store's file
#[derive(Error, Debug)]
pub enum StoreError {
    /// File missing or unreadable
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Malformed JSON or wrong shape
    #[error("Invalid JSON in '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Permission, disk or rename failure while writing
    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Serializing the in-memory value failed
    #[error("Failed to serialize value: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Save requested before a backing file was chosen
    #[error("No file selected. Choose a location with 'save as' first.")]
    NoPath,

    /// The filesystem watcher could not be set up
    #[error("Failed to watch '{path}': {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

impl StoreError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Read { .. } => ErrorKind::Read,
            StoreError::Parse { .. } => ErrorKind::Parse,
            StoreError::Write { .. } | StoreError::Serialize(_) => ErrorKind::Write,
            StoreError::NoPath => ErrorKind::NoPath,
            StoreError::Watch { .. } => ErrorKind::Watch,
        }
    }

    /// True when the file simply does not exist yet
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Read { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StoreError::Parse { .. } => {
                Some("Fix the JSON by hand or restore the file from version control, then open it again.")
            }
            StoreError::Write { source, .. } if is_disk_full_error(source) => {
                Some("Free up disk space and save again.")
            }
            StoreError::Write { source, .. }
                if source.kind() == io::ErrorKind::PermissionDenied =>
            {
                Some("Check file and directory permissions, or save to a different location.")
            }
            StoreError::NoPath => Some("Use 'save as' to pick a file."),
            _ => None,
        }
    }
}

/// Check if an I/O error indicates disk full condition
fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
