//! Processed-set document persistence.
//!
//! # Design
//! - Document shape: `{"processed_ids": [...], "last_updated": "<timestamp>"}`.
//! - Ids are written sorted; timestamps are RFC 3339 UTC. Timestamps without an
//!   offset are read as UTC.
//! - Saves go through a sibling temp file, `fsync`, then `rename`, so a reader sees
//!   either the old document or the new one.
//! - A missing, unreadable or malformed document loads as an empty set.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{StateError, StateResult};

/// Identifiers of handled submission requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedSet {
    ids: BTreeSet<String>,
    last_updated: Option<DateTime<Utc>>,
}

impl ProcessedSet {
    /// Empty set that has never been saved.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `request_id` has been handled.
    #[must_use]
    pub fn contains(&self, request_id: &str) -> bool {
        self.ids.contains(request_id)
    }

    /// Record `request_id` as handled; returns `false` when it was already present.
    pub fn insert(&mut self, request_id: impl Into<String>) -> bool {
        self.ids.insert(request_id.into())
    }

    /// Number of handled requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no request has been handled yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Handled ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Time of the last successful save, when known.
    #[must_use]
    pub const fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }
}

impl<S: Into<String>> FromIterator<S> for ProcessedSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
            last_updated: None,
        }
    }
}

#[derive(Serialize)]
struct DocumentOut<'a> {
    processed_ids: Vec<&'a str>,
    last_updated: String,
}

#[derive(Deserialize)]
struct DocumentIn {
    #[serde(default)]
    processed_ids: Vec<String>,
    #[serde(default)]
    last_updated: Option<String>,
}

/// Reads and writes the processed-set document at a fixed path.
#[derive(Debug, Clone)]
pub struct ProcessedStore {
    path: PathBuf,
}

impl ProcessedStore {
    /// Store backed by the document at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Document location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the set, treating every failure as "nothing processed yet".
    #[must_use]
    pub fn load(&self) -> ProcessedSet {
        match self.try_load() {
            Ok(Some(set)) => {
                info!(
                    path = %self.path.display(),
                    count = set.len(),
                    "loaded processed submissions"
                );
                set
            }
            Ok(None) => {
                info!(path = %self.path.display(), "no processed submissions file; starting empty");
                ProcessedSet::new()
            }
            Err(err) => {
                warn!(
                    error = %err,
                    detail = %error_detail(&err),
                    path = %self.path.display(),
                    "could not load processed submissions; starting empty"
                );
                ProcessedSet::new()
            }
        }
    }

    /// Load the set, reporting failures; `Ok(None)` when the document is absent.
    ///
    /// # Errors
    ///
    /// Returns an error when the document exists but cannot be read or parsed.
    pub fn try_load(&self) -> StateResult<Option<ProcessedSet>> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StateError::io("state.read", &self.path, err)),
        };
        let document: DocumentIn = serde_json::from_slice(&raw)
            .map_err(|source| StateError::json("state.parse", &self.path, source))?;
        Ok(Some(ProcessedSet {
            ids: document.processed_ids.into_iter().collect(),
            last_updated: document.last_updated.as_deref().and_then(parse_timestamp),
        }))
    }

    /// Persist the full set with a fresh timestamp, replacing the previous document.
    ///
    /// On success the set's `last_updated` is advanced to the written timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error when the document cannot be encoded or written; the
    /// previous document is left in place.
    pub fn save(&self, set: &mut ProcessedSet) -> StateResult<()> {
        let now = Utc::now();
        let document = DocumentOut {
            processed_ids: set.ids().collect(),
            last_updated: now.to_rfc3339(),
        };
        let encoded = serde_json::to_vec_pretty(&document)
            .map_err(|source| StateError::json("state.encode", &self.path, source))?;
        write_atomically(&self.path, &encoded)?;
        set.last_updated = Some(now);
        info!(
            path = %self.path.display(),
            count = set.len(),
            "saved processed submissions"
        );
        Ok(())
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> StateResult<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|source| StateError::io("state.create_parent", parent, source))?;
    }
    let staging = path.with_extension(format!("tmp.{}", Uuid::new_v4().simple()));
    let result = write_and_rename(&staging, path, bytes);
    if result.is_err() {
        let _ = fs::remove_file(&staging);
    }
    result
}

fn write_and_rename(staging: &Path, path: &Path, bytes: &[u8]) -> StateResult<()> {
    let mut file = File::create(staging)
        .map_err(|source| StateError::io("state.create_temp", staging, source))?;
    file.write_all(bytes)
        .map_err(|source| StateError::io("state.write_temp", staging, source))?;
    file.sync_all()
        .map_err(|source| StateError::io("state.sync_temp", staging, source))?;
    fs::rename(staging, path).map_err(|source| StateError::io("state.rename", path, source))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|naive| naive.and_utc())
        })
        .ok()
}

fn error_detail(err: &StateError) -> String {
    match err {
        StateError::Io { source, .. } => source.to_string(),
        StateError::Json { source, .. } => source.to_string(),
    }
}
