//! Error types for remote repository calls.
//!
//! # Design
//! - Messages stay constant; the failing operation and file key travel as fields.
//! - [`RepositoryError::kind`] gives a stable label for logs and metrics.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors raised while talking to the remote repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The HTTP client could not be constructed.
    #[error("failed to build http client")]
    ClientBuild {
        /// Underlying reqwest error.
        source: reqwest::Error,
    },
    /// The access token cannot be sent as a header value.
    #[error("access token is not a valid header value")]
    InvalidToken,
    /// The API base URL cannot carry path segments.
    #[error("api base url cannot be extended")]
    InvalidEndpoint {
        /// Operation that needed the endpoint.
        operation: &'static str,
    },
    /// The request could not be sent or the body could not be read.
    #[error("repository request failed")]
    Transport {
        /// Operation that failed.
        operation: &'static str,
        /// Underlying reqwest error.
        source: reqwest::Error,
    },
    /// The server answered with a non-success status.
    #[error("repository returned an error status")]
    Status {
        /// Operation that failed.
        operation: &'static str,
        /// HTTP status code.
        status: u16,
    },
    /// The response body was not the expected JSON.
    #[error("failed to decode repository response")]
    Decode {
        /// Operation that failed.
        operation: &'static str,
        /// Underlying reqwest error.
        source: reqwest::Error,
    },
    /// The file descriptor carried no download link.
    #[error("file has no download link")]
    MissingLink {
        /// File key from the descriptor.
        key: String,
    },
    /// The download link is not a valid URL.
    #[error("file download link is not a valid url")]
    InvalidLink {
        /// File key from the descriptor.
        key: String,
        /// Underlying parse error.
        source: url::ParseError,
    },
    /// The file key cannot be used as a local file name.
    #[error("file name is not safe to write locally")]
    UnsafeFileName {
        /// File key from the descriptor.
        key: String,
    },
    /// Writing the downloaded bytes failed.
    #[error("failed to write downloaded file")]
    Io {
        /// Destination path.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl RepositoryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Stable label for the failure, suitable as a metric label value.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ClientBuild { .. } => "client_build",
            Self::InvalidToken => "invalid_token",
            Self::InvalidEndpoint { .. } => "invalid_endpoint",
            Self::Transport { .. } => "transport",
            Self::Status { .. } => "status",
            Self::Decode { .. } => "decode",
            Self::MissingLink { .. } => "missing_link",
            Self::InvalidLink { .. } => "invalid_link",
            Self::UnsafeFileName { .. } => "unsafe_file_name",
            Self::Io { .. } => "io",
        }
    }
}
