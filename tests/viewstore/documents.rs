//! Document CRUD through the public API

use crate::common::*;
use serde_json::json;

#[test]
fn add_then_get_round_trips() {
    let db = test_db();
    db.add("doc", json!({"a": 1})).unwrap();
    assert_eq!(db.get("doc").unwrap(), Document::from(json!({"a": 1})));
}

#[test]
fn second_add_fails_with_key_exists() {
    let db = test_db();
    db.add("doc", "first").unwrap();
    let err = db.add("doc", "second").unwrap_err();
    assert!(err.is_key_exists());
    assert_eq!(db.get("doc").unwrap(), Document::from("first"));
}

#[test]
fn delete_then_get_fails_with_not_found() {
    let db = test_db();
    db.add("doc", "x").unwrap();
    db.delete("doc", CasToken::NONE).unwrap();
    assert!(db.get("doc").unwrap_err().is_not_found());
    assert!(db.delete("doc", CasToken::NONE).unwrap_err().is_not_found());
}

#[test]
fn set_upserts() {
    let db = test_db();
    db.set("doc", "one", CasToken::NONE).unwrap();
    db.set("doc", "two", CasToken::NONE).unwrap();
    assert_eq!(db.get("doc").unwrap(), Document::from("two"));
    assert_eq!(db.len(), 1);
}

#[test]
fn replace_missing_fails() {
    let db = test_db();
    assert!(db.replace("doc", "x", CasToken::NONE).unwrap_err().is_not_found());
    assert!(!db.contains("doc"));
}

#[test]
fn get_multi_reports_partial_results() {
    let db = test_db();
    db.add("a", "1").unwrap();
    db.add("b", "2").unwrap();

    let result = db.get_multi(["a", "b", "missing"]);
    assert!(!result.all_ok);
    assert_eq!(result.values.len(), 3);
    assert_eq!(result.get("a"), Some(&Document::from("1")));
    assert_eq!(result.values["missing"], None);

    let result = db.get_multi(["a", "b"]);
    assert!(result.all_ok);
}

#[test]
fn text_and_json_documents_keep_their_form() {
    let db = test_db();
    db.add("text", r#"{"looks": "like json"}"#).unwrap();
    db.add("json", json!({"is": "json"})).unwrap();

    let text = db.get("text").unwrap();
    assert_eq!(text.as_text(), Some(r#"{"looks": "like json"}"#));
    let parsed = db.get("json").unwrap();
    assert_eq!(parsed.as_json(), Some(&json!({"is": "json"})));
}
