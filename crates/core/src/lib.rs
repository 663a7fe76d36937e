//! Core types for viewstore
//!
//! This crate defines the foundational types shared by the map evaluator and
//! the engine:
//! - Document / DocMeta: stored values and the metadata map functions see
//! - ViewKey: emitted keys with a total collation order
//! - QueryOptions / Row: view query request and result types
//! - CasToken: optimistic-lock tokens
//! - DesignDocument / ViewDefinition: view sources grouped by design
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod error;
pub mod key;
pub mod query;
pub mod types;

pub use document::{DocMeta, Document};
pub use error::{Error, InvalidQuery, Result};
pub use key::{collate, ViewKey};
pub use query::{KeySelection, QueryOptions, Row};
pub use types::{CasToken, DesignDocument, ViewDefinition};
