//! Errors raised by the processed-set store.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result alias for state operations.
pub type StateResult<T> = Result<T, StateError>;

/// Failures reading or writing the processed-set document.
#[derive(Debug, Error)]
pub enum StateError {
    /// Filesystem failure.
    #[error("state io failure")]
    Io {
        /// Operation that failed.
        operation: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The document could not be encoded or decoded.
    #[error("state json failure")]
    Json {
        /// Operation that failed.
        operation: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying serde error.
        source: serde_json::Error,
    },
}

impl StateError {
    pub(crate) fn io(operation: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn json(operation: &'static str, path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }
}
