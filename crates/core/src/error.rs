//! Error types for viewstore
//!
//! This module defines all error types surfaced by the document store and the
//! view layer. We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.
//!
//! Map function failures are deliberately absent: they are recovered inside
//! the view layer and never reach a caller.

use std::io;
use thiserror::Error;

/// Result type alias for viewstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// A view query that referenced something the registry does not know
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidQuery {
    /// No design is registered under this name
    #[error("invalid design name: {0}")]
    UnknownDesign(String),

    /// The design exists but has no view with this name
    #[error("invalid view name: {design}/{view}")]
    UnknownView {
        /// Design that was searched
        design: String,
        /// View that was requested
        view: String,
    },
}

/// Error types for the document store
#[derive(Debug, Error)]
pub enum Error {
    /// Document (or other referenced key) is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness violation on add, or CAS mismatch against an active lock
    #[error("Key exists: {0}")]
    KeyExists(String),

    /// Query referenced an unknown design or view
    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] InvalidQuery),

    /// I/O error (loader, config files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration or argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Document absent
    pub fn not_found(key: impl AsRef<str>) -> Self {
        Error::NotFound(format!("key '{}' not found", key.as_ref()))
    }

    /// Key already present on add
    pub fn already_exists(key: impl AsRef<str>) -> Self {
        Error::KeyExists(format!("key '{}' already exists", key.as_ref()))
    }

    /// CAS token does not match the active lock
    pub fn cas_mismatch(key: impl AsRef<str>) -> Self {
        Error::KeyExists(format!("key '{}' is locked with a different cas", key.as_ref()))
    }

    /// True for [`Error::NotFound`]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// True for [`Error::KeyExists`]
    pub fn is_key_exists(&self) -> bool {
        matches!(self, Error::KeyExists(_))
    }

    /// True for [`Error::InvalidQuery`]
    pub fn is_invalid_query(&self) -> bool {
        matches!(self, Error::InvalidQuery(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
