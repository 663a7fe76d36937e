//! Concurrent writers and readers

use crate::common::*;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[test]
fn concurrent_writers_keep_view_consistent() {
    let db = Arc::new(test_db());
    db.design_create(DESIGN, gender_design());

    let threads = 4;
    let per_thread = 50;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let db = Arc::clone(&db);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let docs = people(per_thread, t as u64);
                barrier.wait();
                for (i, (id, doc)) in docs.iter().enumerate() {
                    db.add(id, doc.clone()).unwrap();
                    // every third document is deleted again
                    if i % 3 == 0 {
                        db.delete(id, CasToken::NONE).unwrap();
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut stored = db.keys();
    stored.sort();
    let mut indexed: Vec<String> = gender_ids(&db, "Male")
        .into_iter()
        .chain(gender_ids(&db, "Female"))
        .collect();
    indexed.sort();
    assert_eq!(indexed, stored);
    assert_eq!(db.len(), threads * (per_thread - (per_thread + 2) / 3));
}

#[test]
fn readers_never_see_dangling_rows() {
    let db = Arc::new(test_db());
    db.design_create(DESIGN, gender_design());
    let docs = people(100, 11);

    let writer = {
        let db = Arc::clone(&db);
        let docs = docs.clone();
        thread::spawn(move || {
            for (id, doc) in &docs {
                db.set(id, doc.clone(), CasToken::NONE).unwrap();
            }
            for (id, _) in &docs {
                db.delete(id, CasToken::NONE).unwrap();
            }
        })
    };

    let reader = {
        let db = Arc::clone(&db);
        thread::spawn(move || {
            for _ in 0..200 {
                // include_docs fails if a row outlives its document
                db.query(DESIGN, BY_GENDER, &QueryOptions::new().include_docs(true))
                    .unwrap();
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
    assert!(db.is_empty());
    assert_eq!(db.view_len(DESIGN, BY_GENDER).unwrap(), 0);
}

#[test]
fn contended_lock_has_one_winner() {
    let db = Arc::new(test_db());
    db.add("counter", "0").unwrap();
    let cas = db.lock("counter", Duration::ZERO);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let db = Arc::clone(&db);
            thread::spawn(move || {
                let token = if i == 0 { cas } else { CasToken::NONE };
                db.set("counter", i.to_string(), token).is_ok()
            })
        })
        .collect();
    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(winners, 1);
    assert_eq!(db.get("counter").unwrap(), Document::from("0"));
}
