//! Per-run scratch storage.
//!
//! # Design
//! - One uniquely named root per run, owned by [`ScratchRoot`].
//! - Each submission gets `submission_<id>` under the root; ids with characters
//!   outside `[A-Za-z0-9._-]` are hex-encoded behind a `~` marker, which keeps
//!   names contained in the root and distinct from verbatim ones.
//! - Removal never raises: failures are logged and a missing tree is a no-op.
//!   Dropping the root destroys it, so early returns and unwinding still clean up.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{error, info};

use crate::error::{FsOpsError, FsOpsResult};

const SUBMISSION_DIR_PREFIX: &str = "submission_";

/// The scratch root of one run.
#[derive(Debug)]
pub struct ScratchRoot {
    path: PathBuf,
    dir: Option<TempDir>,
}

impl ScratchRoot {
    /// Create a fresh root named `<prefix><random>` under `parent`, or under the
    /// system temporary directory when `parent` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created.
    pub fn create(parent: Option<&Path>, prefix: &str) -> FsOpsResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix);
        let dir = match parent {
            Some(parent) => builder
                .tempdir_in(parent)
                .map_err(|source| FsOpsError::io("scratch.create_root", parent, source))?,
            None => builder.tempdir().map_err(|source| {
                FsOpsError::io("scratch.create_root", std::env::temp_dir(), source)
            })?,
        };
        let path = dir.path().to_path_buf();
        info!(path = %path.display(), "using scratch directory");
        Ok(Self {
            path,
            dir: Some(dir),
        })
    }

    /// Root directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the submission directory for `request_id`, without creating it.
    #[must_use]
    pub fn submission_path(&self, request_id: &str) -> PathBuf {
        self.path.join(submission_dir_name(request_id))
    }

    /// Create, or reuse, the submission directory for `request_id`.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created.
    pub fn create_submission_dir(&self, request_id: &str) -> FsOpsResult<PathBuf> {
        let path = self.submission_path(request_id);
        fs::create_dir_all(&path)
            .map_err(|source| FsOpsError::io("scratch.create_submission_dir", &path, source))?;
        Ok(path)
    }

    /// Remove the submission directory for `request_id` and everything in it.
    pub fn remove_submission_dir(&self, request_id: &str) {
        remove_tree(&self.submission_path(request_id));
    }

    /// Remove the whole root. Calling it again, or dropping afterwards, is a no-op.
    pub fn destroy(&mut self) {
        if let Some(dir) = self.dir.take() {
            match dir.close() {
                Ok(()) => info!(path = %self.path.display(), "cleaned up scratch directory"),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => error!(
                    error = %err,
                    path = %self.path.display(),
                    "failed to clean up scratch directory"
                ),
            }
        }
    }

    /// Whether [`ScratchRoot::destroy`] has already run.
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.dir.is_none()
    }
}

impl Drop for ScratchRoot {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Directory name used for the submission identified by `request_id`.
#[must_use]
pub fn submission_dir_name(request_id: &str) -> String {
    let verbatim = !request_id.is_empty()
        && request_id
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-'));
    if verbatim {
        return format!("{SUBMISSION_DIR_PREFIX}{request_id}");
    }
    let mut name = String::with_capacity(SUBMISSION_DIR_PREFIX.len() + 1 + request_id.len() * 2);
    name.push_str(SUBMISSION_DIR_PREFIX);
    name.push('~');
    for byte in request_id.bytes() {
        let _ = write!(name, "{byte:02x}");
    }
    name
}

fn remove_tree(path: &Path) {
    match fs::remove_dir_all(path) {
        Ok(()) => info!(path = %path.display(), "removed submission scratch directory"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => error!(
            error = %err,
            path = %path.display(),
            "failed to remove submission scratch directory"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult<T> = anyhow::Result<T>;

    #[test]
    fn safe_ids_are_used_verbatim() {
        assert_eq!(submission_dir_name("req-1.a_b"), "submission_req-1.a_b");
        assert_eq!(
            submission_dir_name("3c1383da-d7ab-4167-8f12-4d8aa0cc637f"),
            "submission_3c1383da-d7ab-4167-8f12-4d8aa0cc637f"
        );
    }

    #[test]
    fn hostile_ids_are_encoded() {
        assert_eq!(submission_dir_name("../x"), "submission_~2e2e2f78");
        assert_eq!(submission_dir_name(""), "submission_~");
        assert_ne!(submission_dir_name("a/b"), submission_dir_name("a_b"));
    }

    #[test]
    fn submission_dirs_are_distinct_and_reused() -> TestResult<()> {
        let parent = tempfile::tempdir()?;
        let root = ScratchRoot::create(Some(parent.path()), "zenodo_downloads_")?;
        let first = root.create_submission_dir("a")?;
        let again = root.create_submission_dir("a")?;
        let second = root.create_submission_dir("b")?;
        assert_eq!(first, again);
        assert_ne!(first, second);
        assert!(first.starts_with(root.path()));
        Ok(())
    }

    #[test]
    fn destroy_is_idempotent() -> TestResult<()> {
        let parent = tempfile::tempdir()?;
        let mut root = ScratchRoot::create(Some(parent.path()), "zenodo_downloads_")?;
        let sub = root.create_submission_dir("a")?;
        fs::write(sub.join("file.bin"), b"bytes")?;
        let path = root.path().to_path_buf();

        root.destroy();
        assert!(!path.exists());
        assert!(root.is_destroyed());
        root.destroy();
        Ok(())
    }

    #[test]
    fn drop_removes_root() -> TestResult<()> {
        let parent = tempfile::tempdir()?;
        let path = {
            let root = ScratchRoot::create(Some(parent.path()), "zenodo_downloads_")?;
            root.create_submission_dir("a")?;
            root.path().to_path_buf()
        };
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn removing_absent_submission_dir_is_noop() -> TestResult<()> {
        let parent = tempfile::tempdir()?;
        let root = ScratchRoot::create(Some(parent.path()), "zenodo_downloads_")?;
        root.remove_submission_dir("never-created");
        assert!(root.path().exists());
        Ok(())
    }
}
