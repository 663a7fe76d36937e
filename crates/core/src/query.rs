//! View query types
//!
//! [`QueryOptions`] is the request side of a view query and [`Row`] the
//! result side. Options resolve into a [`KeySelection`] with this precedence:
//! `key`, then `range_exact`, then `start_key`/`end_key`, then a full scan.

use crate::document::Document;
use crate::key::ViewKey;
use serde::{Deserialize, Serialize};
use std::ops::Bound;

/// Options for querying a view
///
/// # Examples
///
/// ```
/// use viewstore_core::QueryOptions;
///
/// let by_key = QueryOptions::new().key("Male").include_docs(true);
/// let by_range = QueryOptions::new().start_key(18).end_key(65);
/// # let _ = (by_key, by_range);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Return only the bucket for this key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<ViewKey>,
    /// Inclusive lower bound (default: lowest key)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_key: Option<ViewKey>,
    /// Inclusive upper bound (default: highest key)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_key: Option<ViewKey>,
    /// Single-value range `[k, k]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_exact: Option<ViewKey>,
    /// Hydrate each row with its source document
    #[serde(default)]
    pub include_docs: bool,
    /// Walk buckets from the highest key down
    #[serde(default)]
    pub descending: bool,
    /// Maximum number of rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Rows to drop from the front of the result
    #[serde(default)]
    pub skip: usize,
}

/// Which buckets a query touches
#[derive(Debug, Clone, PartialEq)]
pub enum KeySelection {
    /// Exactly one bucket
    Key(ViewKey),
    /// All buckets between the bounds
    Range(Bound<ViewKey>, Bound<ViewKey>),
    /// Every bucket
    All,
}

impl QueryOptions {
    /// Options selecting every row
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a single key
    pub fn key(mut self, key: impl Into<ViewKey>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set the inclusive lower bound
    pub fn start_key(mut self, key: impl Into<ViewKey>) -> Self {
        self.start_key = Some(key.into());
        self
    }

    /// Set the inclusive upper bound
    pub fn end_key(mut self, key: impl Into<ViewKey>) -> Self {
        self.end_key = Some(key.into());
        self
    }

    /// Select the range `[key, key]`
    pub fn range_exact(mut self, key: impl Into<ViewKey>) -> Self {
        self.range_exact = Some(key.into());
        self
    }

    /// Hydrate rows with documents
    pub fn include_docs(mut self, include: bool) -> Self {
        self.include_docs = include;
        self
    }

    /// Reverse bucket order
    pub fn descending(mut self, descending: bool) -> Self {
        self.descending = descending;
        self
    }

    /// Cap the number of rows
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip leading rows
    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    /// Resolve the key fields into a selection
    pub fn selection(&self) -> KeySelection {
        if let Some(key) = &self.key {
            return KeySelection::Key(key.clone());
        }
        if let Some(exact) = &self.range_exact {
            return KeySelection::Range(
                Bound::Included(exact.clone()),
                Bound::Included(exact.clone()),
            );
        }
        if self.start_key.is_none() && self.end_key.is_none() {
            return KeySelection::All;
        }
        let start = match &self.start_key {
            Some(k) => Bound::Included(k.clone()),
            None => Bound::Unbounded,
        };
        let end = match &self.end_key {
            Some(k) => Bound::Included(k.clone()),
            None => Bound::Unbounded,
        };
        KeySelection::Range(start, end)
    }
}

/// One result row of a view query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Emitted key
    pub key: ViewKey,
    /// Emitted value
    pub value: serde_json::Value,
    /// Id of the document that produced the emission
    pub doc_id: String,
    /// Source document, when `include_docs` was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<Document>,
}

impl Row {
    /// Row without a hydrated document
    pub fn new(key: ViewKey, value: serde_json::Value, doc_id: impl Into<String>) -> Self {
        Row {
            key,
            value,
            doc_id: doc_id.into(),
            doc: None,
        }
    }
}
