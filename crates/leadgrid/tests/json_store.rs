//! The JSON file store against real files.

use std::fs;

use chrono::{FixedOffset, TimeZone};
use leadgrid::{FetchCriteria, JsonFileStore, LeadStore, StoreError};
use leadgrid_seeker::{Clock, FieldKey, LeadPatch};

fn clock() -> Clock {
    let utc = FixedOffset::east_opt(0).unwrap();
    Clock::fixed(utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap())
}

#[test]
fn missing_file_is_empty_and_created_on_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("leads.json");
    let store = JsonFileStore::open(&path).with_clock(clock());

    assert!(store.fetch(&FetchCriteria::new()).unwrap().is_empty());
    assert!(!path.exists());

    let patch = LeadPatch::new()
        .assign(FieldKey::Email, "ada@example.test")
        .unwrap();
    let created = store.create(&patch).unwrap();
    assert_eq!(created.created_at.as_deref(), Some("2024-06-10T12:00:00.000Z"));
    assert!(path.exists());

    let reopened = JsonFileStore::open(&path);
    assert_eq!(reopened.resolve(&created.id).unwrap(), created);
}

#[test]
fn unknown_columns_survive_a_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("leads.json");
    fs::write(
        &path,
        r#"[{"id": "1", "email": "x@example.test", "owner": {"name": "sam"}}]"#,
    )
    .unwrap();
    let store = JsonFileStore::open(&path).with_clock(clock());

    let patch = LeadPatch::new().assign(FieldKey::Stage, "won").unwrap();
    store.update("1", &patch).unwrap();

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw[0]["owner"]["name"], "sam");
    assert_eq!(raw[0]["stage"], "won");
    assert_eq!(raw[0]["updated_at"], "2024-06-10T12:00:00.000Z");
}

#[test]
fn soft_deleted_rows_stay_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("leads.json");
    fs::write(&path, r#"[{"id": "1", "email": "x@example.test"}]"#).unwrap();
    let store = JsonFileStore::open(&path).with_clock(clock());

    store.soft_delete("1").unwrap();
    assert!(store.fetch(&FetchCriteria::new()).unwrap().is_empty());

    let all = store.fetch(&FetchCriteria::new().include_deleted()).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].deleted_at.as_deref(), Some("2024-06-10T12:00:00.000Z"));
}

#[test]
fn malformed_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("leads.json");
    fs::write(&path, "{ not json").unwrap();
    let store = JsonFileStore::open(&path);

    assert!(matches!(
        store.fetch(&FetchCriteria::new()),
        Err(StoreError::Json(_))
    ));
}

#[test]
fn unreadable_path_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    // a directory cannot be read as a file
    let store = JsonFileStore::open(dir.path());
    let err = store.fetch(&FetchCriteria::new()).unwrap_err();
    assert!(matches!(err, StoreError::Io { .. }));
    assert!(err.to_string().starts_with("failed to access"));
}
