//! CAS locks and TTL expiry

use crate::common::*;
use std::time::Duration;

#[test]
fn set_while_locked_needs_the_token() {
    let db = test_db();
    db.set("k", "v", CasToken::NONE).unwrap();
    let cas = db.lock("k", Duration::ZERO);

    assert!(db.set("k", "x", CasToken::NONE).unwrap_err().is_key_exists());
    db.set("k", "x", cas).unwrap();
    assert_eq!(db.get("k").unwrap(), Document::from("x"));
}

#[test]
fn tokens_strictly_increase_from_initial_cas() {
    let db = Database::with_config(ViewStoreConfig {
        initial_cas: 500,
        ..ViewStoreConfig::default()
    })
    .unwrap();
    let first = db.lock("a", Duration::ZERO);
    let second = db.lock("b", Duration::ZERO);
    let third = db.lock("a", Duration::ZERO);
    assert_eq!(first, CasToken::new(500));
    assert!(first < second && second < third);
}

#[test]
fn relock_invalidates_old_token() {
    let db = test_db();
    db.add("k", "v").unwrap();
    let old = db.lock("k", Duration::ZERO);
    let new = db.lock("k", Duration::ZERO);
    assert!(db.set("k", "x", old).unwrap_err().is_key_exists());
    db.set("k", "x", new).unwrap();
}

#[test]
fn ttl_lock_expires_without_unlock() {
    let db = test_db();
    db.set("k", "v", CasToken::NONE).unwrap();
    db.lock("k", Duration::from_millis(50));
    assert!(db.set("k", "x", CasToken::NONE).is_err());

    assert!(wait_until(Duration::from_secs(2), || !db.is_locked("k")));
    db.set("k", "x", CasToken::NONE).unwrap();
}

#[test]
fn earlier_deadline_scheduled_after_later_one_still_fires() {
    let db = test_db();
    db.lock("late", Duration::from_secs(60));
    db.lock("early", Duration::from_millis(30));
    assert!(wait_until(Duration::from_secs(2), || !db.is_locked("early")));
    assert!(db.is_locked("late"));
}

#[test]
fn unlock_then_set_without_token() {
    let db = test_db();
    db.add("k", "v").unwrap();
    let cas = db.lock("k", Duration::from_secs(60));
    db.unlock("k", cas).unwrap();
    db.set("k", "x", CasToken::NONE).unwrap();
}

#[test]
fn drop_with_pending_expiry_returns_promptly() {
    let db = test_db();
    db.lock("k", Duration::from_secs(3600));
    let started = std::time::Instant::now();
    drop(db);
    assert!(started.elapsed() < Duration::from_secs(5));
}
