//! Document and metadata types
//!
//! A stored document is either raw text or structured JSON. Map functions see
//! the structured form whenever one exists, so text that happens to hold JSON
//! is parsed before being handed to a view.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A stored document
///
/// # Examples
///
/// ```
/// use viewstore_core::Document;
///
/// let text = Document::from("hello");
/// assert_eq!(text.to_canonical_string(), "hello");
///
/// let json = Document::from(serde_json::json!({"name": "Ada"}));
/// assert_eq!(json.to_canonical_string(), r#"{"name":"Ada"}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Document {
    /// Opaque text, stored as given
    Text(String),
    /// Structured value
    Json(serde_json::Value),
}

impl Document {
    /// Canonical text form: raw text, or compact JSON
    pub fn to_canonical_string(&self) -> String {
        match self {
            Document::Text(s) => s.clone(),
            Document::Json(v) => v.to_string(),
        }
    }

    /// The value a map function receives as its document argument
    ///
    /// Structured documents are returned as-is. Text is parsed as JSON when
    /// it is valid JSON and passed through as a JSON string otherwise.
    pub fn to_map_input(&self) -> serde_json::Value {
        match self {
            Document::Json(v) => v.clone(),
            Document::Text(s) => serde_json::from_str(s)
                .unwrap_or_else(|_| serde_json::Value::String(s.clone())),
        }
    }

    /// Get as &str if this is a text document
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Document::Text(s) => Some(s),
            Document::Json(_) => None,
        }
    }

    /// Get as JSON if this is a structured document
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Document::Json(v) => Some(v),
            Document::Text(_) => None,
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical_string())
    }
}

impl From<&str> for Document {
    fn from(s: &str) -> Self {
        Document::Text(s.to_string())
    }
}

impl From<String> for Document {
    fn from(s: String) -> Self {
        Document::Text(s)
    }
}

impl From<serde_json::Value> for Document {
    fn from(v: serde_json::Value) -> Self {
        Document::Json(v)
    }
}

/// Metadata passed alongside a document to map functions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocMeta {
    /// Document id
    pub id: String,
}

impl DocMeta {
    /// Metadata for the given document id
    pub fn new(id: impl Into<String>) -> Self {
        DocMeta { id: id.into() }
    }

    /// `{"id": ...}` as bound into a map function
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "id": self.id })
    }
}
