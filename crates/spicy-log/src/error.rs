//! Error types for log collaborators.

use spicy_core::{NoteError, TlogError};
use thiserror::Error;

/// Errors surfaced by log appenders, publication awaiters and tile readers.
#[derive(Debug, Error)]
pub enum LogError {
    /// A requested tile does not exist (yet).
    #[error("tile not found: level {level} index {index} width {width}")]
    NotFound { level: u64, index: u64, width: u8 },

    /// Local I/O or state failure inside the log.
    #[error("I/O error: {0}")]
    Io(String),

    /// Failure talking to a remote log.
    #[error("transport error: {0}")]
    Transport(String),

    /// The log shut down before the operation completed.
    #[error("log closed")]
    Closed,

    /// Fetched tiles do not hash to the checkpoint root.
    #[error("downloaded tiles inconsistent with checkpoint root")]
    InconsistentTiles,

    /// The checkpoint does not include the assigned index.
    #[error("checkpoint of size {size} does not cover index {index}")]
    NotCovered { index: u64, size: u64 },

    /// Merkle tree computation failed.
    #[error("tree error: {0}")]
    Tree(TlogError),

    /// Producing the checkpoint note failed.
    #[error("checkpoint signing failed: {0}")]
    Signing(#[from] NoteError),
}

impl From<TlogError> for LogError {
    fn from(e: TlogError) -> Self {
        match e {
            TlogError::InconsistentTiles => Self::InconsistentTiles,
            TlogError::IndexOutOfRange { index, tree_size } => Self::NotCovered {
                index,
                size: tree_size,
            },
            other => Self::Tree(other),
        }
    }
}

/// Result type for log operations.
pub type Result<T> = std::result::Result<T, LogError>;
