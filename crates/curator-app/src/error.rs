//! # Design
//!
//! - Centralize application-level errors for bootstrap and the run pass.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Map each failure class to a stable process exit code.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Exit code for configuration errors.
pub const EXIT_CONFIG: i32 = 2;
/// Exit code for operational failures.
pub const EXIT_FAILURE: i32 = 3;
/// Exit code for runs that left new requests unprocessed.
pub const EXIT_PARTIAL: i32 = 4;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be resolved.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: curator_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: curator_telemetry::TelemetryError,
    },
    /// The repository client could not be built.
    #[error("repository operation failed")]
    Repository {
        /// Operation identifier.
        operation: &'static str,
        /// Source repository error.
        source: curator_repository::RepositoryError,
    },
    /// Scratch storage operations failed.
    #[error("scratch storage operation failed")]
    FsOps {
        /// Operation identifier.
        operation: &'static str,
        /// Source fsops error.
        source: curator_fsops::FsOpsError,
    },
    /// Processed-set operations failed.
    #[error("processed-set operation failed")]
    State {
        /// Operation identifier.
        operation: &'static str,
        /// Source state error.
        source: curator_state::StateError,
    },
    /// IO operations failed.
    #[error("io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Optional path involved in the failure.
        path: Option<PathBuf>,
        /// Source IO error.
        source: io::Error,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: curator_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: curator_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn repository(
        operation: &'static str,
        source: curator_repository::RepositoryError,
    ) -> Self {
        Self::Repository { operation, source }
    }

    pub(crate) const fn fsops(operation: &'static str, source: curator_fsops::FsOpsError) -> Self {
        Self::FsOps { operation, source }
    }

    pub(crate) const fn state(operation: &'static str, source: curator_state::StateError) -> Self {
        Self::State { operation, source }
    }

    /// Process exit code for this failure.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => EXIT_CONFIG,
            _ => EXIT_FAILURE,
        }
    }

    /// Message for the terminal, including the chain of underlying causes.
    #[must_use]
    pub fn display_message(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}
