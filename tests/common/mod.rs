//! Shared test utilities for the integration suite.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's
//! main.rs.

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use std::sync::Once;
use std::time::{Duration, Instant};
pub use viewstore::{
    CasToken, Database, DesignDocument, Document, QueryOptions, Row, ViewDefinition, ViewKey,
    ViewStoreConfig,
};

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Install a test subscriber once; honours `RUST_LOG`
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Fresh database with tracing installed
pub fn test_db() -> Database {
    init_tracing();
    Database::new().unwrap()
}

// ============================================================================
// Fixtures
// ============================================================================

pub const DESIGN: &str = "people";
pub const BY_GENDER: &str = "by_gender";

pub const GENDER_MAP: &str = r#"
function (doc, meta) {
    if (doc.type == 'person') {
        emit(doc.gender, null);
    }
}
"#;

pub const AGE_MAP: &str = "function (doc, meta) { emit(doc.age, doc.name); }";

pub fn gender_design() -> DesignDocument {
    DesignDocument::new().with_view(BY_GENDER, ViewDefinition::new(GENDER_MAP))
}

/// A random person document with a unique id
pub fn random_person(rng: &mut impl Rng) -> (String, Value) {
    let id = uuid::Uuid::new_v4().to_string();
    let gender = if rng.gen_bool(0.5) { "Male" } else { "Female" };
    let doc = json!({
        "type": "person",
        "name": format!("person-{}", &id[..8]),
        "gender": gender,
        "age": rng.gen_range(0..100),
    });
    (id, doc)
}

/// `n` random people from a fixed seed
pub fn people(n: usize, seed: u64) -> Vec<(String, Value)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| random_person(&mut rng)).collect()
}

// ============================================================================
// Assertions
// ============================================================================

/// Doc ids of rows, in row order
pub fn doc_ids(rows: &[Row]) -> Vec<String> {
    rows.iter().map(|r| r.doc_id.clone()).collect()
}

/// Doc ids under one key of the gender view, sorted
pub fn gender_ids(db: &Database, gender: &str) -> Vec<String> {
    let rows = db
        .query(DESIGN, BY_GENDER, &QueryOptions::new().key(gender))
        .unwrap();
    let mut ids = doc_ids(&rows);
    ids.sort();
    ids
}

/// Poll `cond` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}
