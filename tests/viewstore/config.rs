//! Configuration files

use crate::common::*;
use std::time::Duration;
use tempfile::TempDir;
use viewstore::{Error, OpenOptions, CONFIG_FILE_NAME};

#[test]
fn default_toml_round_trips_through_a_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, ViewStoreConfig::default_toml()).unwrap();
    assert_eq!(ViewStoreConfig::from_file(&path).unwrap(), ViewStoreConfig::default());
}

#[test]
fn config_from_file_drives_the_database() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "enforce_lock_on_replace = false\ninitial_cas = 9000\n").unwrap();

    let config = ViewStoreConfig::from_file(&path).unwrap();
    let db = Database::open(OpenOptions::new().config(config)).unwrap();
    db.add("k", "v").unwrap();
    assert_eq!(db.lock("k", Duration::ZERO), CasToken::new(9000));
    // replace ignores the lock under this config, set does not
    db.replace("k", "w", CasToken::NONE).unwrap();
    assert!(db.set("k", "x", CasToken::NONE).is_err());
}

#[test]
fn invalid_config_is_rejected() {
    let err = ViewStoreConfig::from_toml_str("script_max_depth = 0").unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}
