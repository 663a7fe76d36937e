//! Document store engine for viewstore
//!
//! This crate ties the lower layers together:
//! - Database: documents, CAS locks and the design registry behind one lock
//! - Lock expiry: background thread releasing TTL locks
//! - Views: per-view emission indexes kept current on every write
//! - Loader: bulk preloading of documents and view definitions
//!
//! Map functions are compiled and run by `viewstore-mapfn`; the shared
//! value types live in `viewstore-core`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod database;
pub mod design;
mod expiry;
pub mod loader;
pub mod locks;
pub mod view;

pub use database::{
    Database, MultiResult, OpenOptions, ViewStoreConfig, CONFIG_FILE_NAME, DEFAULT_DESIGN_NAME,
};
pub use design::DesignRegistry;
pub use loader::{load_documents, load_views};
pub use locks::{ExpiryIndex, LockTable};
pub use view::{DocumentMap, ViewIndex};
