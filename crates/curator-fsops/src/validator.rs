//! Checks applied to each downloaded file.
//!
//! # Design
//! - Each step records what it learned; a failing step never hides the others.
//! - The verdict is a fixed policy: the file exists, is readable, and its size is
//!   strictly between zero and [`MAX_FILE_SIZE_BYTES`].
//! - MD5 is an integrity fingerprint here, not a security primitive.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use serde::Serialize;
use tracing::{error, info};

/// Exclusive upper bound on file size for a passing verdict (100 MiB).
pub const MAX_FILE_SIZE_BYTES: u64 = 100 * 1024 * 1024;

const HASH_CHUNK_BYTES: usize = 4096;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Outcome of checking one local file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    /// Path that was checked.
    pub path: PathBuf,
    /// Final path component.
    pub file_name: String,
    /// Whether the path existed.
    pub exists: bool,
    /// Size in bytes from metadata.
    pub size_bytes: u64,
    /// Size in MiB rounded to two decimals.
    pub size_mb: f64,
    /// Lower-case hex MD5 of the contents, when the file could be read.
    pub md5: Option<String>,
    /// Lower-cased extension including the leading dot.
    pub file_type: Option<String>,
    /// Whether the contents could be read end to end.
    pub readable: bool,
    /// Overall verdict.
    pub passed: bool,
}

impl ValidationResult {
    fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            file_name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            exists: false,
            size_bytes: 0,
            size_mb: 0.0,
            md5: None,
            file_type: None,
            readable: false,
            passed: false,
        }
    }
}

/// Applies the size/readability policy to local files.
#[derive(Debug, Clone, Copy)]
pub struct FileValidator {
    max_size_bytes: u64,
}

impl Default for FileValidator {
    fn default() -> Self {
        Self {
            max_size_bytes: MAX_FILE_SIZE_BYTES,
        }
    }
}

impl FileValidator {
    /// Validator with the standard 100 MiB limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check `path` and return everything learned about it.
    #[must_use]
    pub fn check(&self, path: &Path) -> ValidationResult {
        let mut result = ValidationResult::empty(path);

        match path.try_exists() {
            Ok(true) => result.exists = true,
            Ok(false) => {
                info!(file = %result.file_name, "file check FAILED: file does not exist");
                return result;
            }
            Err(err) => {
                error!(error = %err, path = %path.display(), "error checking file");
                return result;
            }
        }

        let mut unexpected = false;
        match fs::metadata(path) {
            Ok(metadata) => {
                result.size_bytes = metadata.len();
                result.size_mb = size_in_mb(metadata.len());
            }
            Err(err) => {
                error!(error = %err, path = %path.display(), "error reading file metadata");
                unexpected = true;
            }
        }

        result.file_type = file_type(path);

        if let Ok(digest) = md5_hex(path) {
            result.readable = true;
            result.md5 = Some(digest);
        }

        result.passed = !unexpected
            && result.exists
            && result.readable
            && result.size_bytes > 0
            && result.size_bytes < self.max_size_bytes;

        let status = if result.passed { "PASSED" } else { "FAILED" };
        info!(
            file = %result.file_name,
            size_mb = result.size_mb,
            "file check {status}"
        );
        result
    }
}

fn file_type(path: &Path) -> Option<String> {
    path.extension()
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
}

#[allow(clippy::cast_precision_loss)]
fn size_in_mb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
}

fn md5_hex(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Md5::new();
    let mut buffer = [0_u8; HASH_CHUNK_BYTES];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
