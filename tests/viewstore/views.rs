//! View consistency and queries

use crate::common::*;
use serde_json::json;

fn seeded(n: usize) -> (Database, Vec<(String, serde_json::Value)>) {
    let db = test_db();
    db.design_create(DESIGN, gender_design());
    let people = people(n, 7);
    for (id, doc) in &people {
        db.add(id, doc.clone()).unwrap();
    }
    (db, people)
}

fn expected_ids(people: &[(String, serde_json::Value)], gender: &str) -> Vec<String> {
    let mut ids: Vec<String> = people
        .iter()
        .filter(|(_, doc)| doc["gender"] == gender)
        .map(|(id, _)| id.clone())
        .collect();
    ids.sort();
    ids
}

#[test]
fn gender_view_tracks_inserts() {
    let (db, people) = seeded(40);
    assert_eq!(gender_ids(&db, "Male"), expected_ids(&people, "Male"));
    assert_eq!(gender_ids(&db, "Female"), expected_ids(&people, "Female"));
}

#[test]
fn gender_view_tracks_replace_and_delete() {
    let (db, people) = seeded(20);
    let (id, doc) = &people[0];
    let flipped = if doc["gender"] == "Male" { "Female" } else { "Male" };

    let mut changed = doc.clone();
    changed["gender"] = json!(flipped);
    db.replace(id, changed, CasToken::NONE).unwrap();
    assert!(gender_ids(&db, flipped).contains(id));
    let original = doc["gender"].as_str().unwrap();
    assert!(!gender_ids(&db, original).contains(id));

    db.delete(id, CasToken::NONE).unwrap();
    assert!(!gender_ids(&db, flipped).contains(id));
    assert_eq!(db.view_len(DESIGN, BY_GENDER).unwrap(), people.len() - 1);
}

#[test]
fn non_matching_documents_are_not_indexed() {
    let db = test_db();
    db.design_create(DESIGN, gender_design());
    db.add("robot", json!({"type": "robot", "gender": "n/a"})).unwrap();
    db.add("note", "just some text").unwrap();
    assert!(db.query(DESIGN, BY_GENDER, &QueryOptions::new()).unwrap().is_empty());
}

#[test]
fn full_scan_returns_one_row_per_document() {
    let db = test_db();
    let people = people(25, 3);
    for (id, doc) in &people {
        db.add(id, doc.clone()).unwrap();
    }
    let by_id = ViewDefinition::new("function (doc, meta) { emit(meta.id, null) }");
    let design = DesignDocument::new().with_view("by_id", by_id);
    db.design_create(DESIGN, design);

    let rows = db.query(DESIGN, "by_id", &QueryOptions::new()).unwrap();
    let mut expected: Vec<String> = people.iter().map(|(id, _)| id.clone()).collect();
    expected.sort();
    // keys are the ids, so collation order is id order
    assert_eq!(doc_ids(&rows), expected);
}

#[test]
fn include_docs_hydrates_rows() {
    let (db, people) = seeded(5);
    let rows = db
        .query(DESIGN, BY_GENDER, &QueryOptions::new().include_docs(true))
        .unwrap();
    assert_eq!(rows.len(), 5);
    for row in rows {
        let (_, doc) = people.iter().find(|(id, _)| *id == row.doc_id).unwrap();
        assert_eq!(row.doc, Some(Document::from(doc.clone())));
    }
}

#[test]
fn range_queries_over_ages() {
    let db = test_db();
    db.design_create(
        DESIGN,
        DesignDocument::new().with_view("by_age", ViewDefinition::new(AGE_MAP)),
    );
    for (i, age) in [30, 10, 50, 20, 40].iter().enumerate() {
        db.add(&format!("p{}", i), json!({"name": format!("n{}", age), "age": age})).unwrap();
    }

    let ages = |options: QueryOptions| -> Vec<i64> {
        db.query(DESIGN, "by_age", &options)
            .unwrap()
            .into_iter()
            .map(|r| r.key.as_i64().unwrap())
            .collect()
    };

    assert_eq!(ages(QueryOptions::new()), vec![10, 20, 30, 40, 50]);
    assert_eq!(ages(QueryOptions::new().start_key(20).end_key(40)), vec![20, 30, 40]);
    assert_eq!(ages(QueryOptions::new().start_key(35)), vec![40, 50]);
    assert_eq!(ages(QueryOptions::new().end_key(15)), vec![10]);
    assert_eq!(ages(QueryOptions::new().range_exact(30)), vec![30]);
    assert_eq!(ages(QueryOptions::new().start_key(40).end_key(20)), Vec::<i64>::new());
    assert_eq!(ages(QueryOptions::new().descending(true).limit(2)), vec![50, 40]);
    assert_eq!(ages(QueryOptions::new().skip(3)), vec![40, 50]);

    let rows = db.query(DESIGN, "by_age", &QueryOptions::new().key(20)).unwrap();
    assert_eq!(rows[0].value, json!("n20"));
}

#[test]
fn broken_map_function_yields_empty_view() {
    let db = test_db();
    db.add("p", json!({"gender": "Male"})).unwrap();
    let design = DesignDocument::new()
        .with_view(
            "syntax",
            ViewDefinition::new("function (doc { emit(doc.gender) }"),
        )
        .with_view(
            "runtime",
            ViewDefinition::new("function (doc) { emit(doc.missing.deeper, 1) }"),
        )
        .with_view(
            "not_iterable",
            ViewDefinition::new("function (doc) { for (var j of doc.big) { emit(j, 1) } }"),
        );
    db.design_create(DESIGN, design);

    for view in ["syntax", "runtime", "not_iterable"] {
        assert!(db.query(DESIGN, view, &QueryOptions::new()).unwrap().is_empty());
    }
    // writes still succeed
    db.set("p", json!({"gender": "Female"}), CasToken::NONE).unwrap();
}

#[test]
fn step_limit_stops_runaway_map() {
    let db = Database::with_config(ViewStoreConfig {
        script_step_limit: 200,
        ..ViewStoreConfig::default()
    })
    .unwrap();
    let items: Vec<i64> = (0..1000).collect();
    db.add("big", json!({ "items": items })).unwrap();
    db.add("small", json!({ "items": [1, 2] })).unwrap();

    let map = "function (doc, meta) { \
        var total = 0; \
        for (var x of doc.items) { total = total + x } \
        emit(total, meta.id) }";
    db.design_create(DESIGN, DesignDocument::new().with_view("sum", ViewDefinition::new(map)));

    let rows = db.query(DESIGN, "sum", &QueryOptions::new()).unwrap();
    assert_eq!(doc_ids(&rows), vec!["small"]);
    assert_eq!(rows[0].key, ViewKey::from(3));
}

#[test]
fn text_documents_holding_json_are_mapped() {
    let db = test_db();
    db.design_create(DESIGN, gender_design());
    db.add("t", r#"{"type": "person", "gender": "Female"}"#).unwrap();
    assert_eq!(gender_ids(&db, "Female"), vec!["t"]);
}
