//! Guard for turning remote file keys into local file names.

use std::path::{Component, Path};

/// Return `key` when it is safe to use verbatim as a single local file name.
///
/// Keys that are empty, `.` or `..`, absolute, or that contain a path separator
/// or NUL byte are rejected, so a download can never escape its directory.
#[must_use]
pub fn safe_file_name(key: &str) -> Option<&str> {
    if key.is_empty() || key.contains(['/', '\\', '\0']) {
        return None;
    }
    let mut components = Path::new(key).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Some(key),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_are_kept_verbatim() {
        assert_eq!(safe_file_name("data.csv"), Some("data.csv"));
        assert_eq!(safe_file_name("Report Final.PDF"), Some("Report Final.PDF"));
        assert_eq!(safe_file_name(".hidden"), Some(".hidden"));
        assert_eq!(safe_file_name("unknown_file"), Some("unknown_file"));
    }

    #[test]
    fn traversal_and_separators_are_rejected() {
        for key in ["", ".", "..", "../x", "a/b", "/etc/passwd", "a\\b", "nul\0byte"] {
            assert_eq!(safe_file_name(key), None, "{key:?} should be rejected");
        }
    }
}
