use std::fs::{self, File};
use std::path::Path;

use curator_fsops::{FileValidator, MAX_FILE_SIZE_BYTES, ScratchRoot};

type TestResult<T> = anyhow::Result<T>;

fn sized_file(dir: &Path, name: &str, len: u64) -> TestResult<std::path::PathBuf> {
    let path = dir.join(name);
    File::create(&path)?.set_len(len)?;
    Ok(path)
}

#[test]
fn size_boundaries_decide_the_verdict() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let validator = FileValidator::new();

    let cases = [
        ("empty.bin", 0, false),
        ("one.bin", 1, true),
        ("just_under.bin", MAX_FILE_SIZE_BYTES - 1, true),
        ("exact.bin", MAX_FILE_SIZE_BYTES, false),
    ];
    for (name, len, expected) in cases {
        let path = sized_file(dir.path(), name, len)?;
        let result = validator.check(&path);
        assert!(result.exists, "{name} should exist");
        assert!(result.readable, "{name} should be readable");
        assert_eq!(result.size_bytes, len);
        assert_eq!(result.passed, expected, "unexpected verdict for {name}");
    }
    Ok(())
}

#[test]
fn exact_limit_reports_one_hundred_mb() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let path = sized_file(dir.path(), "exact.bin", MAX_FILE_SIZE_BYTES)?;
    let result = FileValidator::new().check(&path);
    assert!((result.size_mb - 100.0).abs() < f64::EPSILON);
    Ok(())
}

#[test]
fn missing_file_fails_with_zeroed_fields() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let result = FileValidator::new().check(&dir.path().join("absent.csv"));
    assert!(!result.exists);
    assert_eq!(result.size_bytes, 0);
    assert!(result.md5.is_none());
    assert!(result.file_type.is_none());
    assert!(!result.readable);
    assert!(!result.passed);
    Ok(())
}

#[test]
fn identical_content_hashes_identically() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let content: Vec<u8> = (0..10_000_u32).flat_map(u32::to_le_bytes).collect();
    let first = dir.path().join("first.dat");
    let second = dir.path().join("second.DAT");
    fs::write(&first, &content)?;
    fs::write(&second, &content)?;

    let validator = FileValidator::new();
    let a = validator.check(&first);
    let b = validator.check(&second);
    assert!(a.md5.is_some());
    assert_eq!(a.md5, b.md5);
    assert_eq!(a.file_type, b.file_type);
    Ok(())
}

#[test]
fn scratch_root_lives_under_configured_parent() -> TestResult<()> {
    let parent = tempfile::tempdir()?;
    let mut root = ScratchRoot::create(Some(parent.path()), "zenodo_downloads_")?;
    assert!(root.path().starts_with(parent.path()));
    let name = root
        .path()
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    assert!(name.starts_with("zenodo_downloads_"));

    let sub = root.create_submission_dir("req/../1")?;
    assert_eq!(sub.parent(), Some(root.path()));
    fs::write(sub.join("x.bin"), b"x")?;
    root.remove_submission_dir("req/../1");
    assert!(!sub.exists());
    assert!(root.path().exists());

    root.destroy();
    assert_eq!(fs::read_dir(parent.path())?.count(), 0);
    Ok(())
}
