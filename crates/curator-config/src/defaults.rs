//! Default values applied when neither the config file nor the caller sets a field.

/// Base URL of the public Zenodo REST API.
pub(crate) const API_BASE: &str = "https://zenodo.org/api";
/// File that records which submission requests have been handled.
pub(crate) const PROCESSED_FILE: &str = "processed_submissions.json";
/// Prefix for the per-run scratch root directory.
pub(crate) const SCRATCH_PREFIX: &str = "zenodo_downloads_";
/// Upper bound on a single remote call.
pub(crate) const HTTP_TIMEOUT_SECS: u64 = 60;
/// Largest timeout accepted from configuration.
pub(crate) const MAX_HTTP_TIMEOUT_SECS: u64 = 3_600;
/// Log level used when `RUST_LOG` is not set.
pub(crate) const LOG_LEVEL: &str = "info";
