use std::fs;

use curator_state::{ProcessedSet, ProcessedStore, StateError};

type TestResult<T> = anyhow::Result<T>;

#[test]
fn absent_document_loads_empty() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let store = ProcessedStore::new(dir.path().join("processed_submissions.json"));
    assert!(store.try_load()?.is_none());
    let set = store.load();
    assert!(set.is_empty());
    assert!(set.last_updated().is_none());
    Ok(())
}

#[test]
fn corrupt_document_loads_empty() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("processed_submissions.json");
    fs::write(&path, "{\"processed_ids\": [\"a\", ")?;
    let store = ProcessedStore::new(&path);

    assert!(matches!(store.try_load(), Err(StateError::Json { .. })));
    assert!(store.load().is_empty());
    Ok(())
}

#[test]
fn documents_from_older_tools_are_accepted() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("processed_submissions.json");
    fs::write(
        &path,
        r#"{
  "processed_ids": ["req-b", "req-a"],
  "last_updated": "2024-03-05T14:02:11.532411"
}"#,
    )?;

    let set = ProcessedStore::new(&path).load();
    assert_eq!(set.ids().collect::<Vec<_>>(), ["req-a", "req-b"]);
    assert!(set.last_updated().is_some());
    Ok(())
}

#[test]
fn missing_ids_field_means_empty_set() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("processed_submissions.json");
    fs::write(&path, r#"{"last_updated": "not a timestamp"}"#)?;

    let set = ProcessedStore::new(&path).load();
    assert!(set.is_empty());
    assert!(set.last_updated().is_none());
    Ok(())
}

#[test]
fn save_overwrites_wholesale_without_leftovers() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("processed_submissions.json");
    let store = ProcessedStore::new(&path);

    let mut first: ProcessedSet = ["x", "y"].into_iter().collect();
    store.save(&mut first)?;
    let mut second: ProcessedSet = ["z"].into_iter().collect();
    store.save(&mut second)?;

    let loaded = store.load();
    assert_eq!(loaded.ids().collect::<Vec<_>>(), ["z"]);
    assert_eq!(loaded.last_updated(), second.last_updated());
    assert_eq!(fs::read_dir(dir.path())?.count(), 1);
    Ok(())
}

#[test]
fn saving_twice_without_changes_keeps_the_same_ids() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let store = ProcessedStore::new(dir.path().join("processed_submissions.json"));
    let mut set: ProcessedSet = ["req-1", "req-2"].into_iter().collect();
    store.save(&mut set)?;

    let mut reloaded = store.load();
    store.save(&mut reloaded)?;
    let again = store.load();
    assert_eq!(
        again.ids().collect::<Vec<_>>(),
        set.ids().collect::<Vec<_>>()
    );
    Ok(())
}

#[test]
fn save_into_unwritable_location_reports_error() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"file, not a directory")?;
    let store = ProcessedStore::new(blocker.join("processed.json"));

    let mut set: ProcessedSet = ["a"].into_iter().collect();
    assert!(matches!(store.save(&mut set), Err(StateError::Io { .. })));
    assert!(set.last_updated().is_none());
    Ok(())
}
