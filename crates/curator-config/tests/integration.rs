use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use curator_config::{ConfigError, ConfigLoader, ConfigOverrides};

#[test]
fn file_values_are_overridden_by_caller() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let path = temp.path().join("curator.json");
    fs::write(
        &path,
        r#"{
            "community_id": "from-file",
            "access_token": "file-token",
            "api_base": "https://sandbox.zenodo.org/api",
            "processed_file": "state/processed.json",
            "http_timeout_secs": 15,
            "log_format": "json"
        }"#,
    )?;

    let config = ConfigLoader::new()
        .with_file(Some(path))
        .with_overrides(ConfigOverrides {
            community_id: Some("from-cli".into()),
            ..ConfigOverrides::default()
        })
        .load()?;

    assert_eq!(config.community_id, "from-cli");
    assert_eq!(config.access_token.expose(), "file-token");
    assert_eq!(config.api_base.as_str(), "https://sandbox.zenodo.org/api");
    assert_eq!(config.processed_file, PathBuf::from("state/processed.json"));
    assert_eq!(config.http_timeout, Duration::from_secs(15));
    Ok(())
}

#[test]
fn unknown_keys_are_rejected() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let path = temp.path().join("curator.json");
    fs::write(&path, r#"{"community": "typo"}"#)?;

    let err = ConfigLoader::new().with_file(Some(path)).load().unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    Ok(())
}

#[test]
fn missing_file_reports_read_error() {
    let err = ConfigLoader::new()
        .with_file(Some(PathBuf::from("/definitely/missing/curator.json")))
        .load()
        .unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn token_is_never_echoed_in_errors() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let path = temp.path().join("curator.json");
    fs::write(
        &path,
        r#"{"community_id": "bad/id", "access_token": "very-secret"}"#,
    )?;

    let err = ConfigLoader::new().with_file(Some(path)).load().unwrap_err();
    assert!(!format!("{err:?}").contains("very-secret"));
    Ok(())
}
