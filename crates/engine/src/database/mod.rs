//! Database struct: documents, CAS locks and views behind one lock
//!
//! [`Database`] owns every piece of state: the document map, the lock table
//! with its expiry index, and the design registry. All of it sits in a single
//! `parking_lot::Mutex`, and every public operation holds that mutex for its
//! whole duration. A write therefore returns only after every view has seen
//! it, and a query never observes a half-applied write.
//!
//! ## Locks
//!
//! `lock` hands out a fresh [`CasToken`]. While a key is locked, `set`,
//! `delete` and `unlock` (and `replace`, unless disabled in the config) must
//! present that token or fail with `KeyExists`. Passing [`CasToken::NONE`]
//! means "no token".
//!
//! Locks taken with a non-zero TTL are released by a background thread once
//! their deadline passes. The thread is joined when the `Database` drops.
//!
//! ## Sharing
//!
//! All operations take `&self`; wrap the database in an `Arc` to share it
//! between threads.

pub mod config;

pub use config::{ViewStoreConfig, CONFIG_FILE_NAME};

use crate::design::DesignRegistry;
use crate::expiry::ExpiryWorker;
use crate::loader;
use crate::locks::LockTable;
use crate::view::DocumentMap;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use viewstore_core::{
    CasToken, DesignDocument, DocMeta, Document, Error, QueryOptions, Result, Row,
};

/// Design name used by [`Database::open`] when none is given
pub const DEFAULT_DESIGN_NAME: &str = "default";

// ============================================================================
// Shared state
// ============================================================================

/// Everything guarded by the database mutex
#[derive(Debug)]
pub(crate) struct State {
    pub(crate) docs: DocumentMap,
    pub(crate) locks: LockTable,
    pub(crate) designs: DesignRegistry,
}

impl State {
    fn upsert(&mut self, key: &str, document: Document) {
        self.docs.insert(key.to_string(), document);
        let meta = DocMeta::new(key);
        self.designs.notify(&meta, self.docs.get(key));
    }

    fn remove(&mut self, key: &str) {
        self.docs.remove(key);
        self.designs.notify(&DocMeta::new(key), None);
    }
}

/// State plus the handles the expiry thread needs
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) state: Mutex<State>,
    /// Signalled when a lock with a deadline is taken, and on shutdown
    pub(crate) expiry_ready: Condvar,
    pub(crate) shutdown: AtomicBool,
}

// ============================================================================
// Results and options
// ============================================================================

/// Result of [`Database::get_multi`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiResult {
    /// Requested key to document, `None` where the key was absent
    pub values: HashMap<String, Option<Document>>,
    /// False if any requested key was absent
    pub all_ok: bool,
}

impl MultiResult {
    /// Document for `key`, if it was requested and present
    pub fn get(&self, key: &str) -> Option<&Document> {
        self.values.get(key).and_then(Option::as_ref)
    }
}

/// How [`Database::open`] populates a new database
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Directory of documents to preload, one file per document
    pub data_dir: Option<PathBuf>,
    /// Directory of view definitions to install, one JSON file per view
    pub view_dir: Option<PathBuf>,
    /// Design the loaded views are installed under
    pub design_name: String,
    /// Store configuration
    pub config: ViewStoreConfig,
}

impl Default for OpenOptions {
    fn default() -> Self {
        OpenOptions {
            data_dir: None,
            view_dir: None,
            design_name: DEFAULT_DESIGN_NAME.to_string(),
            config: ViewStoreConfig::default(),
        }
    }
}

impl OpenOptions {
    /// Options that load nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload documents from `dir`
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Install views from `dir`
    pub fn view_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.view_dir = Some(dir.into());
        self
    }

    /// Design name for loaded views
    pub fn design_name(mut self, name: impl Into<String>) -> Self {
        self.design_name = name.into();
        self
    }

    /// Store configuration
    pub fn config(mut self, config: ViewStoreConfig) -> Self {
        self.config = config;
        self
    }
}

// ============================================================================
// Database
// ============================================================================

/// In-memory document store with CAS locks and map-function views
///
/// # Example
///
/// ```
/// use viewstore_core::{CasToken, DesignDocument, QueryOptions, ViewDefinition};
/// use viewstore_engine::Database;
///
/// let db = Database::new()?;
/// db.add("p1", serde_json::json!({"gender": "Female"}))?;
///
/// let design = DesignDocument::new()
///     .with_view("by_gender", ViewDefinition::new("function (doc) { emit(doc.gender, null) }"));
/// db.design_create("people", design);
///
/// let rows = db.query("people", "by_gender", &QueryOptions::new().key("Female"))?;
/// assert_eq!(rows[0].doc_id, "p1");
///
/// let cas = db.lock("p1", std::time::Duration::ZERO);
/// assert!(db.set("p1", "changed", CasToken::NONE).is_err());
/// db.set("p1", "changed", cas)?;
/// # Ok::<(), viewstore_core::Error>(())
/// ```
#[derive(Debug)]
pub struct Database {
    shared: Arc<Shared>,
    config: ViewStoreConfig,
    expiry: ExpiryWorker,
}

impl Database {
    /// Empty database with the default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ViewStoreConfig::default())
    }

    /// Empty database
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the config does not validate, `Io` if the expiry
    /// thread cannot be spawned.
    pub fn with_config(config: ViewStoreConfig) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                docs: DocumentMap::new(),
                locks: LockTable::new(config.initial_cas),
                designs: DesignRegistry::new(config.limits()),
            }),
            expiry_ready: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });
        let expiry = ExpiryWorker::spawn(Arc::clone(&shared))?;

        Ok(Database {
            shared,
            config,
            expiry,
        })
    }

    /// Create a database and preload it
    ///
    /// Documents are loaded before views, so views are built over the full
    /// data set. A duplicate document id fails the open.
    pub fn open(options: OpenOptions) -> Result<Self> {
        let db = Self::with_config(options.config)?;
        let mut docs = 0;
        let mut views = 0;
        if let Some(dir) = &options.data_dir {
            docs = loader::load_documents(&db, dir)?;
        }
        if let Some(dir) = &options.view_dir {
            views = loader::load_views(&db, dir, &options.design_name)?;
        }
        info!(docs, views, design = %options.design_name, "database opened");
        Ok(db)
    }

    /// Active configuration
    pub fn config(&self) -> &ViewStoreConfig {
        &self.config
    }

    // ========================================================================
    // Documents
    // ========================================================================

    /// Insert or overwrite `key`
    ///
    /// Fails with `KeyExists` if the key is locked and `cas` is not the
    /// lock's token.
    pub fn set(&self, key: &str, value: impl Into<Document>, cas: CasToken) -> Result<()> {
        let value = value.into();
        let mut state = self.shared.state.lock();
        state.locks.check(key, cas)?;
        state.upsert(key, value);
        Ok(())
    }

    /// Insert `key`, failing with `KeyExists` if it is already present
    pub fn add(&self, key: &str, value: impl Into<Document>) -> Result<()> {
        let value = value.into();
        let mut state = self.shared.state.lock();
        if state.docs.contains_key(key) {
            return Err(Error::already_exists(key));
        }
        state.upsert(key, value);
        Ok(())
    }

    /// Overwrite an existing `key`
    ///
    /// Fails with `NotFound` if absent. The lock check applies only when
    /// `enforce_lock_on_replace` is set.
    pub fn replace(&self, key: &str, value: impl Into<Document>, cas: CasToken) -> Result<()> {
        let value = value.into();
        let mut state = self.shared.state.lock();
        if !state.docs.contains_key(key) {
            return Err(Error::not_found(key));
        }
        if self.config.enforce_lock_on_replace {
            state.locks.check(key, cas)?;
        }
        state.upsert(key, value);
        Ok(())
    }

    /// Fetch `key`
    pub fn get(&self, key: &str) -> Result<Document> {
        let state = self.shared.state.lock();
        state.docs.get(key).cloned().ok_or_else(|| Error::not_found(key))
    }

    /// Fetch several keys; missing keys map to `None` and clear `all_ok`
    pub fn get_multi<I, K>(&self, keys: I) -> MultiResult
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let state = self.shared.state.lock();
        let mut result = MultiResult {
            values: HashMap::new(),
            all_ok: true,
        };
        for key in keys {
            let key = key.as_ref();
            let doc = state.docs.get(key).cloned();
            if doc.is_none() {
                result.all_ok = false;
            }
            result.values.insert(key.to_string(), doc);
        }
        result
    }

    /// Remove `key`
    ///
    /// Fails with `NotFound` if absent, then with `KeyExists` if locked under
    /// a different token. The lock itself survives the delete.
    pub fn delete(&self, key: &str, cas: CasToken) -> Result<()> {
        let mut state = self.shared.state.lock();
        if !state.docs.contains_key(key) {
            return Err(Error::not_found(key));
        }
        state.locks.check(key, cas)?;
        state.remove(key);
        Ok(())
    }

    /// True if `key` is stored
    pub fn contains(&self, key: &str) -> bool {
        self.shared.state.lock().docs.contains_key(key)
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.shared.state.lock().docs.len()
    }

    /// True if no documents are stored
    pub fn is_empty(&self) -> bool {
        self.shared.state.lock().docs.is_empty()
    }

    /// Stored keys in ascending order
    pub fn keys(&self) -> Vec<String> {
        self.shared.state.lock().docs.keys().cloned().collect()
    }

    // ========================================================================
    // Locks
    // ========================================================================

    /// Lock `key` and return the new token
    ///
    /// Any existing lock is replaced. The key does not need to exist. A
    /// non-zero `ttl` releases the lock automatically after that long; a `ttl`
    /// past the clock's range never does.
    pub fn lock(&self, key: &str, ttl: Duration) -> CasToken {
        let mut state = self.shared.state.lock();
        let cas = state.locks.lock(key, ttl, Instant::now());
        debug!(key = %key, cas = %cas, ttl_ms = ttl.as_millis() as u64, "lock taken");
        if !ttl.is_zero() {
            self.shared.expiry_ready.notify_one();
        }
        cas
    }

    /// Release the lock on `key`
    ///
    /// A no-op if the key is not locked; `KeyExists` if it is locked under a
    /// different token.
    pub fn unlock(&self, key: &str, cas: CasToken) -> Result<()> {
        self.shared.state.lock().locks.unlock(key, cas)
    }

    /// True if `key` currently holds a lock
    pub fn is_locked(&self, key: &str) -> bool {
        self.shared.state.lock().locks.is_locked(key)
    }

    // ========================================================================
    // Designs and views
    // ========================================================================

    /// Install or redefine a design; new views are built immediately
    pub fn design_create(&self, name: &str, design: DesignDocument) {
        let mut state = self.shared.state.lock();
        let State { docs, designs, .. } = &mut *state;
        designs.create(name, design, docs);
    }

    /// Stored definitions of a design (empty if unknown)
    pub fn design_get(&self, name: &str) -> DesignDocument {
        self.shared.state.lock().designs.get(name)
    }

    /// Forget a design's definitions; its views remain queryable
    pub fn design_delete(&self, name: &str) {
        self.shared.state.lock().designs.delete(name);
    }

    /// No-op kept for API parity
    pub fn design_publish(&self, name: &str) {
        self.shared.state.lock().designs.publish(name);
    }

    /// Query a view
    ///
    /// With `include_docs`, each row carries its source document. Views and
    /// documents are updated under the same lock, so a row always refers to a
    /// stored document; a missing one would surface as `NotFound`.
    pub fn query(&self, design: &str, view: &str, options: &QueryOptions) -> Result<Vec<Row>> {
        let state = self.shared.state.lock();
        let mut rows = state.designs.query(design, view, options)?;
        if options.include_docs {
            for row in &mut rows {
                let doc = state
                    .docs
                    .get(&row.doc_id)
                    .cloned()
                    .ok_or_else(|| Error::not_found(&row.doc_id))?;
                row.doc = Some(doc);
            }
        }
        Ok(rows)
    }

    /// Number of emissions currently held by a view
    pub fn view_len(&self, design: &str, view: &str) -> Result<usize> {
        Ok(self.shared.state.lock().designs.view(design, view)?.len())
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        self.expiry.shutdown(&self.shared);
    }
}
