//! Design registry behavior through the database

use crate::common::*;
use serde_json::json;
use viewstore::{Error, InvalidQuery};

const BY_NAME: &str = "function (doc, meta) { emit(doc.name, null) }";

#[test]
fn redefinition_removes_and_adds_views() {
    let db = test_db();
    db.add("a", json!({"type": "person", "name": "Ann", "gender": "Female"})).unwrap();
    db.add("b", json!({"type": "person", "name": "Bob", "gender": "Male"})).unwrap();
    db.design_create(DESIGN, gender_design());

    let redefined = DesignDocument::new().with_view("by_name", ViewDefinition::new(BY_NAME));
    db.design_create(DESIGN, redefined);

    let err = db.query(DESIGN, BY_GENDER, &QueryOptions::new()).unwrap_err();
    assert!(matches!(err, Error::InvalidQuery(InvalidQuery::UnknownView { .. })));

    // the new view reflects documents stored before it existed
    let rows = db.query(DESIGN, "by_name", &QueryOptions::new()).unwrap();
    assert_eq!(doc_ids(&rows), vec!["a", "b"]);
}

#[test]
fn changed_map_rebuilds_kept_view() {
    let db = test_db();
    db.add("a", json!({"type": "person", "name": "Ann", "gender": "Female"})).unwrap();
    db.design_create(DESIGN, gender_design());

    let redefined = DesignDocument::new().with_view(BY_GENDER, ViewDefinition::new(BY_NAME));
    db.design_create(DESIGN, redefined);

    let rows = db.query(DESIGN, BY_GENDER, &QueryOptions::new().key("Ann")).unwrap();
    assert_eq!(doc_ids(&rows), vec!["a"]);
    assert!(db
        .query(DESIGN, BY_GENDER, &QueryOptions::new().key("Female"))
        .unwrap()
        .is_empty());
}

#[test]
fn design_get_returns_definitions() {
    let db = test_db();
    assert!(db.design_get(DESIGN).is_empty());

    let design =
        gender_design().with_view("by_name", ViewDefinition::new(BY_NAME).with_reduce("_count"));
    db.design_create(DESIGN, design.clone());
    assert_eq!(db.design_get(DESIGN), design);

    let json = serde_json::to_value(db.design_get(DESIGN)).unwrap();
    assert_eq!(json["views"]["by_name"]["reduce"], json!("_count"));
}

#[test]
fn design_delete_keeps_views_queryable() {
    let db = test_db();
    db.add("a", json!({"type": "person", "gender": "Female"})).unwrap();
    db.design_create(DESIGN, gender_design());
    db.design_publish(DESIGN);
    db.design_delete(DESIGN);

    assert!(db.design_get(DESIGN).is_empty());
    assert_eq!(gender_ids(&db, "Female"), vec!["a"]);
}

#[test]
fn unknown_design_and_view() {
    let db = test_db();
    let err = db.query("nope", "v", &QueryOptions::new()).unwrap_err();
    assert!(matches!(err, Error::InvalidQuery(InvalidQuery::UnknownDesign(_))));
    assert!(err.to_string().contains("nope"));

    db.design_create(DESIGN, gender_design());
    assert!(db.query(DESIGN, "v", &QueryOptions::new()).unwrap_err().is_invalid_query());
}

#[test]
fn design_from_json_shape() {
    let design: DesignDocument = serde_json::from_value(json!({
        "views": {
            "by_gender": { "map": GENDER_MAP }
        }
    }))
    .unwrap();
    let db = test_db();
    db.add("a", json!({"type": "person", "gender": "Male"})).unwrap();
    db.design_create(DESIGN, design);
    assert_eq!(gender_ids(&db, "Male"), vec!["a"]);
}
