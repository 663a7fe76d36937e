//! Small shared types: CAS tokens and design definitions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Optimistic-lock token
///
/// Tokens are handed out by `lock` in strictly increasing order and never
/// reused. [`CasToken::NONE`] means "no token" and never matches a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CasToken(u64);

impl CasToken {
    /// Absent token
    pub const NONE: CasToken = CasToken(0);

    /// Wrap a raw token value
    pub const fn new(raw: u64) -> Self {
        CasToken(raw)
    }

    /// Raw token value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// True for [`CasToken::NONE`]
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for CasToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CasToken {
    fn from(raw: u64) -> Self {
        CasToken(raw)
    }
}

/// Source of one view: a map function and an unused reduce function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDefinition {
    /// Map function source
    pub map: String,
    /// Reduce function source (stored, never evaluated)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reduce: Option<String>,
}

impl ViewDefinition {
    /// Definition with only a map function
    pub fn new(map: impl Into<String>) -> Self {
        ViewDefinition {
            map: map.into(),
            reduce: None,
        }
    }

    /// Attach a reduce source
    pub fn with_reduce(mut self, reduce: impl Into<String>) -> Self {
        self.reduce = Some(reduce.into());
        self
    }
}

/// A design document: named view definitions
///
/// Serializes as `{"views": {"<name>": {"map": "...", "reduce": "..."}}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignDocument {
    /// View name to definition
    #[serde(default)]
    pub views: BTreeMap<String, ViewDefinition>,
}

impl DesignDocument {
    /// Empty design
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one view
    pub fn with_view(mut self, name: impl Into<String>, definition: ViewDefinition) -> Self {
        self.views.insert(name.into(), definition);
        self
    }

    /// True if no views are defined
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cas_none() {
        assert!(CasToken::NONE.is_none());
        assert!(!CasToken::new(100).is_none());
        assert_eq!(CasToken::default(), CasToken::NONE);
    }

    #[test]
    fn test_design_document_json_shape() {
        let json = r#"{"views": {"by_name": {"map": "function (doc) { emit(doc.name, null); }"}}}"#;
        let design: DesignDocument = serde_json::from_str(json).unwrap();
        let view = &design.views["by_name"];
        assert!(view.map.contains("emit"));
        assert_eq!(view.reduce, None);
    }

    #[test]
    fn test_design_document_missing_views_is_empty() {
        let design: DesignDocument = serde_json::from_str("{}").unwrap();
        assert!(design.is_empty());
    }

    #[test]
    fn test_view_definition_with_reduce() {
        let def = ViewDefinition::new("m").with_reduce("_count");
        assert_eq!(def.reduce.as_deref(), Some("_count"));
    }
}
