//! Typed configuration consumed by the checker.

use std::fmt::{self, Debug, Formatter};
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

/// Fully resolved configuration for one checker run.
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Community whose inclusion requests are polled.
    pub community_id: String,
    /// Bearer credential attached to every remote call.
    pub access_token: AccessToken,
    /// Base URL of the repository REST API.
    pub api_base: Url,
    /// Location of the persisted processed-set document.
    pub processed_file: PathBuf,
    /// Scratch storage settings.
    pub scratch: ScratchSettings,
    /// Timeout applied to each remote call.
    pub http_timeout: Duration,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// Optional Prometheus textfile written at the end of a run.
    pub metrics_file: Option<PathBuf>,
}

/// Where the per-run scratch root is allocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchSettings {
    /// Parent directory for the scratch root; the system temp dir when `None`.
    pub parent: Option<PathBuf>,
    /// Name prefix of the scratch root.
    pub prefix: String,
}

/// Logging settings handed to the telemetry crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Default filter level when `RUST_LOG` is unset.
    pub level: String,
    /// Output format; inferred from the build profile when `None`.
    pub format: Option<LogFormatSetting>,
    /// Optional file receiving a plain-text copy of the log stream.
    pub file: Option<PathBuf>,
}

/// Log output format requested by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormatSetting {
    /// Human-readable output.
    Pretty,
    /// One JSON object per line.
    Json,
}

/// API credential whose value never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the raw token for use in an `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for AccessToken {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("AccessToken(<redacted>)")
    }
}
