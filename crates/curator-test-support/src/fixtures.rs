//! Filesystem fixtures and request builders.

use std::fs;
use std::path::{Path, PathBuf};

use curator_repository::{FileDescriptor, SubmissionRequest};
use tempfile::TempDir;

/// Create a temporary directory whose name starts with `prefix`.
///
/// # Errors
///
/// Returns an error when the directory cannot be created.
pub fn temp_dir(prefix: &str) -> anyhow::Result<TempDir> {
    Ok(tempfile::Builder::new().prefix(prefix).tempdir()?)
}

/// Entries directly under `dir`, sorted by path.
///
/// # Errors
///
/// Returns an error when the directory cannot be listed.
pub fn entries(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = fs::read_dir(dir)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, _>>()?;
    paths.sort();
    Ok(paths)
}

/// A request with a record id.
#[must_use]
pub fn request(request_id: &str, record_id: &str) -> SubmissionRequest {
    SubmissionRequest::new(request_id, Some(record_id))
}

/// A descriptor whose link points at a fake location derived from the key.
#[must_use]
pub fn file(key: &str) -> FileDescriptor {
    FileDescriptor::new(key, Some(&format!("https://repository.test/files/{key}")))
}
