//! Layered configuration loading.
//!
//! # Design
//! - Sources are merged field by field: defaults, then the JSON file, then the
//!   caller's overrides (environment variables and CLI flags, parsed by the binary).
//! - Required fields have no defaults; resolution fails fast when they are absent.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};
use crate::model::{AccessToken, CheckerConfig, LoggingSettings, ScratchSettings};
use crate::validate::{
    non_blank, parse_api_base, parse_community_id, parse_log_format, parse_scratch_prefix,
    parse_timeout_secs, require,
};

/// Partial configuration supplied by one source.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    /// Community identifier.
    pub community_id: Option<String>,
    /// API access token.
    pub access_token: Option<String>,
    /// API base URL.
    pub api_base: Option<String>,
    /// Processed-set document path.
    pub processed_file: Option<PathBuf>,
    /// Parent directory of the scratch root.
    pub scratch_parent: Option<PathBuf>,
    /// Scratch root name prefix.
    pub scratch_prefix: Option<String>,
    /// Per-call HTTP timeout in seconds.
    pub http_timeout_secs: Option<u64>,
    /// Default log level.
    pub log_level: Option<String>,
    /// Log format name (`pretty` or `json`).
    pub log_format: Option<String>,
    /// Log file path.
    pub log_file: Option<PathBuf>,
    /// Prometheus textfile path.
    pub metrics_file: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Read overrides from a JSON document on disk.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or does not match the expected
    /// shape (unknown keys are rejected).
    pub fn from_json_file(path: &Path) -> ConfigResult<Self> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Layer `higher` on top of `self`; fields set in `higher` win.
    #[must_use]
    pub fn merge(self, higher: Self) -> Self {
        Self {
            community_id: higher.community_id.or(self.community_id),
            access_token: higher.access_token.or(self.access_token),
            api_base: higher.api_base.or(self.api_base),
            processed_file: higher.processed_file.or(self.processed_file),
            scratch_parent: higher.scratch_parent.or(self.scratch_parent),
            scratch_prefix: higher.scratch_prefix.or(self.scratch_prefix),
            http_timeout_secs: higher.http_timeout_secs.or(self.http_timeout_secs),
            log_level: higher.log_level.or(self.log_level),
            log_format: higher.log_format.or(self.log_format),
            log_file: higher.log_file.or(self.log_file),
            metrics_file: higher.metrics_file.or(self.metrics_file),
        }
    }
}

/// Resolves a [`CheckerConfig`] from an optional config file and caller overrides.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    overrides: ConfigOverrides,
}

impl ConfigLoader {
    /// Start with defaults only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the given JSON file as the lowest-precedence explicit source.
    #[must_use]
    pub fn with_file(mut self, path: Option<PathBuf>) -> Self {
        self.file = path;
        self
    }

    /// Apply overrides from the environment or command line.
    #[must_use]
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Merge all sources and validate the result.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be loaded, a required field is missing,
    /// or a supplied value fails validation.
    pub fn load(self) -> ConfigResult<CheckerConfig> {
        resolve(self.merged()?)
    }

    /// Resolve only the processed-set document location.
    ///
    /// Read-only commands use this so they do not require credentials.
    ///
    /// # Errors
    ///
    /// Returns an error when the config file cannot be loaded.
    pub fn processed_file(self) -> ConfigResult<PathBuf> {
        Ok(self
            .merged()?
            .processed_file
            .unwrap_or_else(|| PathBuf::from(defaults::PROCESSED_FILE)))
    }

    fn merged(self) -> ConfigResult<ConfigOverrides> {
        let from_file = match self.file.as_deref() {
            Some(path) => ConfigOverrides::from_json_file(path)?,
            None => ConfigOverrides::default(),
        };
        Ok(from_file.merge(self.overrides))
    }
}

fn resolve(merged: ConfigOverrides) -> ConfigResult<CheckerConfig> {
    let community_id = parse_community_id(&require("community_id", merged.community_id)?)?;
    let access_token = AccessToken::new(require("access_token", merged.access_token)?);

    let api_base = parse_api_base(
        &non_blank(merged.api_base).unwrap_or_else(|| defaults::API_BASE.to_string()),
    )?;
    let processed_file = merged
        .processed_file
        .unwrap_or_else(|| PathBuf::from(defaults::PROCESSED_FILE));
    let prefix = parse_scratch_prefix(
        &non_blank(merged.scratch_prefix).unwrap_or_else(|| defaults::SCRATCH_PREFIX.to_string()),
    )?;
    let http_timeout = parse_timeout_secs(
        merged
            .http_timeout_secs
            .unwrap_or(defaults::HTTP_TIMEOUT_SECS),
    )?;
    let format = non_blank(merged.log_format)
        .map(|raw| parse_log_format(&raw))
        .transpose()?;

    Ok(CheckerConfig {
        community_id,
        access_token,
        api_base,
        processed_file,
        scratch: ScratchSettings {
            parent: merged.scratch_parent,
            prefix,
        },
        http_timeout,
        logging: LoggingSettings {
            level: non_blank(merged.log_level).unwrap_or_else(|| defaults::LOG_LEVEL.to_string()),
            format,
            file: merged.log_file,
        },
        metrics_file: merged.metrics_file,
    })
}
