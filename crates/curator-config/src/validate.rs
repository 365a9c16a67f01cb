//! Validation helpers and parsing utilities for configuration values.

use std::time::Duration;

use url::Url;

use crate::defaults::MAX_HTTP_TIMEOUT_SECS;
use crate::error::{ConfigError, ConfigResult};
use crate::model::LogFormatSetting;

/// Trim a value and treat blank strings as absent.
#[must_use]
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

/// Require a non-blank value for `field`.
///
/// # Errors
///
/// Returns [`ConfigError::MissingField`] when no source supplied a value.
pub fn require(field: &'static str, value: Option<String>) -> ConfigResult<String> {
    non_blank(value).ok_or(ConfigError::MissingField { field })
}

/// Validate a community identifier; it becomes a URL path segment.
///
/// # Errors
///
/// Returns an error when the identifier contains characters that would change the
/// request path.
pub fn parse_community_id(raw: &str) -> ConfigResult<String> {
    if raw.contains(['/', '?', '#', '\\']) || raw.chars().any(char::is_whitespace) {
        return Err(ConfigError::invalid(
            "community_id",
            Some(raw),
            "not_a_path_segment",
        ));
    }
    Ok(raw.to_string())
}

/// Parse the API base URL, accepting only `http` and `https`.
///
/// # Errors
///
/// Returns an error when the value is not an absolute HTTP(S) URL.
pub fn parse_api_base(raw: &str) -> ConfigResult<Url> {
    let url =
        Url::parse(raw).map_err(|_| ConfigError::invalid("api_base", Some(raw), "invalid_url"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ConfigError::invalid(
            "api_base",
            Some(raw),
            "unsupported_scheme",
        )),
    }
}

/// Convert a timeout in seconds into a bounded [`Duration`].
///
/// # Errors
///
/// Returns an error for zero or for values above one hour.
pub fn parse_timeout_secs(secs: u64) -> ConfigResult<Duration> {
    if secs == 0 {
        return Err(ConfigError::invalid(
            "http_timeout_secs",
            Some(&secs.to_string()),
            "zero",
        ));
    }
    if secs > MAX_HTTP_TIMEOUT_SECS {
        return Err(ConfigError::invalid(
            "http_timeout_secs",
            Some(&secs.to_string()),
            "too_large",
        ));
    }
    Ok(Duration::from_secs(secs))
}

/// Validate the scratch directory prefix; it must be a single file-name fragment.
///
/// # Errors
///
/// Returns an error for empty prefixes or prefixes containing path separators.
pub fn parse_scratch_prefix(raw: &str) -> ConfigResult<String> {
    if raw.is_empty() || raw.contains(['/', '\\']) || raw == "." || raw == ".." {
        return Err(ConfigError::invalid(
            "scratch_prefix",
            Some(raw),
            "not_a_file_name",
        ));
    }
    Ok(raw.to_string())
}

/// Parse a log format name.
///
/// # Errors
///
/// Returns an error for names other than `pretty` and `json`.
pub fn parse_log_format(raw: &str) -> ConfigResult<LogFormatSetting> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pretty" | "text" => Ok(LogFormatSetting::Pretty),
        "json" => Ok(LogFormatSetting::Json),
        _ => Err(ConfigError::invalid(
            "log_format",
            Some(raw),
            "unknown_format",
        )),
    }
}
