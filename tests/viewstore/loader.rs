//! Preloading through `Database::open`

use crate::common::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use viewstore::{Error, OpenOptions, DEFAULT_DESIGN_NAME};

fn write(dir: &Path, rel: &str, contents: &str) {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn fixture() -> (TempDir, TempDir) {
    let data = TempDir::new().unwrap();
    write(data.path(), "alice.json", r#"{"type": "person", "gender": "Female"}"#);
    write(data.path(), "people/bob.json", r#"{"type": "person", "gender": "Male"}"#);
    write(data.path(), "_ignored/carol.json", r#"{"type": "person", "gender": "Female"}"#);
    write(data.path(), ".cache/dave.json", r#"{"type": "person", "gender": "Male"}"#);
    write(data.path(), "_eve.json", r#"{"type": "person", "gender": "Female"}"#);

    let views = TempDir::new().unwrap();
    let definition = serde_json::json!({ "map": GENDER_MAP }).to_string();
    write(views.path(), "by_gender.json", &definition);
    (data, views)
}

#[test]
fn open_loads_documents_and_views() {
    init_tracing();
    let (data, views) = fixture();
    let options = OpenOptions::new()
        .data_dir(data.path())
        .view_dir(views.path());
    let db = Database::open(options).unwrap();

    assert_eq!(db.keys(), vec!["alice", "bob"]);
    let rows = db
        .query(DEFAULT_DESIGN_NAME, BY_GENDER, &QueryOptions::new().key("Female"))
        .unwrap();
    assert_eq!(doc_ids(&rows), vec!["alice"]);
}

#[test]
fn open_with_custom_design_name() {
    let (data, views) = fixture();
    let db = Database::open(
        OpenOptions::new()
            .data_dir(data.path())
            .view_dir(views.path())
            .design_name(DESIGN),
    )
    .unwrap();
    assert_eq!(gender_ids(&db, "Male"), vec!["bob"]);
    assert!(db.query(DEFAULT_DESIGN_NAME, BY_GENDER, &QueryOptions::new()).is_err());
}

#[test]
fn open_without_directories_is_empty() {
    let db = Database::open(OpenOptions::new()).unwrap();
    assert!(db.is_empty());
    assert!(db.design_get(DEFAULT_DESIGN_NAME).is_empty());
}

#[test]
fn open_fails_on_missing_directory() {
    let dir = TempDir::new().unwrap();
    let err = Database::open(OpenOptions::new().data_dir(dir.path().join("gone"))).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn loaded_documents_are_text() {
    let (data, _views) = fixture();
    let db = Database::open(OpenOptions::new().data_dir(data.path())).unwrap();
    let doc = db.get("alice").unwrap();
    assert_eq!(doc.as_text(), Some(r#"{"type": "person", "gender": "Female"}"#));
}
