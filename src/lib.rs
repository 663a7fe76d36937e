//! viewstore - in-memory document store with map-function views
//!
//! A local stand-in for a document database during testing. It keeps
//! documents in memory, guards mutations with CAS locks (optionally expiring
//! after a TTL), and maintains "views": indexes built by running a small
//! JavaScript-style map function over every document.
//!
//! # Quick Start
//!
//! ```
//! use viewstore::{CasToken, Database, DesignDocument, QueryOptions, ViewDefinition};
//!
//! let db = Database::new()?;
//! db.add("u1", r#"{"type": "user", "gender": "Female"}"#)?;
//! db.add("u2", r#"{"type": "user", "gender": "Male"}"#)?;
//!
//! db.design_create(
//!     "users",
//!     DesignDocument::new().with_view(
//!         "by_gender",
//!         ViewDefinition::new("function (doc, meta) { if (doc.type == 'user') emit(doc.gender, null); }"),
//!     ),
//! );
//!
//! let rows = db.query("users", "by_gender", &QueryOptions::new().key("Male").include_docs(true))?;
//! assert_eq!(rows.len(), 1);
//! assert_eq!(rows[0].doc_id, "u2");
//!
//! db.delete("u2", CasToken::NONE)?;
//! assert!(db.query("users", "by_gender", &QueryOptions::new().key("Male"))?.is_empty());
//! # Ok::<(), viewstore::Error>(())
//! ```
//!
//! # Architecture
//!
//! - `viewstore-core`: shared types (documents, keys, queries, errors)
//! - `viewstore-mapfn`: the sandboxed map function evaluator
//! - `viewstore-engine`: the database, locks, view indexes and loader
//!
//! This crate re-exports the public surface of all three.

pub use viewstore_core::{
    collate, CasToken, DesignDocument, DocMeta, Document, Error, InvalidQuery, KeySelection,
    QueryOptions, Result, Row, ViewDefinition, ViewKey,
};
pub use viewstore_engine::{
    load_documents, load_views, Database, MultiResult, OpenOptions, ViewStoreConfig,
    CONFIG_FILE_NAME, DEFAULT_DESIGN_NAME,
};
pub use viewstore_mapfn::{Emission, Limits, MapEvaluator, MapFunction, ScriptError};
