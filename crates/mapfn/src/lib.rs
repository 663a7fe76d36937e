//! Map function evaluation for viewstore views
//!
//! A view's map function is a small JavaScript-style snippet:
//!
//! ```text
//! function (doc, meta) {
//!     if (doc.type == 'user') {
//!         emit(doc.gender, null);
//!     }
//! }
//! ```
//!
//! Source is compiled once into a [`MapFunction`] and then run against each
//! document. Every run gets a fresh scope, so compiled functions can be shared
//! freely across threads.
//!
//! # Sandbox
//!
//! The language has no I/O and no host access beyond `emit`, a few string and
//! array helpers and `Array.isArray`. Loops only walk finite collections, and
//! every run is bounded by [`Limits`]: a step budget, a nesting limit that
//! also caps the depth of the parsed tree, and a size budget for the strings,
//! arrays and objects the function builds.
//!
//! # Failure Policy
//!
//! [`MapFunction::run`] reports errors. [`MapFunction::emit_for`] and
//! [`MapEvaluator::evaluate`] log them and return `None`, which is what the
//! view layer uses: a broken map function yields an empty view, never a failed
//! write.

#![warn(clippy::all)]

mod ast;
pub mod error;
mod interp;
mod lexer;
mod parser;
mod value;

pub use error::{ScriptError, ScriptResult};

use interp::Interpreter;
use std::sync::Arc;
use tracing::warn;
use value::ScriptValue;
use viewstore_core::{DocMeta, Document, ViewKey};

/// Default step budget per evaluation
pub const DEFAULT_STEP_LIMIT: u64 = 100_000;

/// Default nesting limit for parsing and evaluation
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Largest nesting limit a store accepts
///
/// Parsing and evaluation recurse on the native stack once per level.
pub const MAX_DEPTH_CEILING: usize = 512;

/// Default size budget for a value built by a map function (4 MiB)
pub const DEFAULT_MAX_VALUE_SIZE: usize = 4 << 20;

/// Resource bounds for a single evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Statements plus expressions evaluated before giving up
    pub step_limit: u64,
    /// Maximum syntactic and evaluation nesting
    pub max_depth: usize,
    /// Largest string, array or object a run may build, measured roughly in
    /// bytes of its flattened form
    pub max_value_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            step_limit: DEFAULT_STEP_LIMIT,
            max_depth: DEFAULT_MAX_DEPTH,
            max_value_size: DEFAULT_MAX_VALUE_SIZE,
        }
    }
}

/// One `(key, value)` pair emitted for a document
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    /// Emitted key
    pub key: ViewKey,
    /// Emitted value
    pub value: serde_json::Value,
}

/// A compiled map function
///
/// # Example
///
/// ```
/// use viewstore_core::{DocMeta, Document};
/// use viewstore_mapfn::{Limits, MapFunction};
///
/// let f = MapFunction::compile("function (doc, meta) { emit(doc.kind, meta.id); }", Limits::default())?;
/// let doc = Document::from(serde_json::json!({"kind": "user"}));
/// let emission = f.run(&doc, &DocMeta::new("u1"))?.unwrap();
/// assert_eq!(emission.key.as_str(), Some("user"));
/// assert_eq!(emission.value, serde_json::json!("u1"));
/// # Ok::<(), viewstore_mapfn::ScriptError>(())
/// ```
#[derive(Debug, Clone)]
pub struct MapFunction {
    source: Arc<str>,
    function: Arc<ast::Function>,
    limits: Limits,
}

impl MapFunction {
    /// Parse `source`
    pub fn compile(source: &str, limits: Limits) -> ScriptResult<Self> {
        let function = parser::parse_function(source, limits.max_depth)?;
        Ok(MapFunction {
            source: Arc::from(source),
            function: Arc::new(function),
            limits,
        })
    }

    /// Source text this function was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Run against one document
    ///
    /// Returns the last emission, `None` if the function never called `emit`.
    pub fn run(&self, document: &Document, meta: &DocMeta) -> ScriptResult<Option<Emission>> {
        let args = vec![
            ScriptValue::from_json(&document.to_map_input()),
            ScriptValue::from_json(&meta.to_json()),
        ];
        let Some((key, value)) = Interpreter::run(&self.function, args, self.limits)? else {
            return Ok(None);
        };
        Ok(Some(Emission {
            key: ViewKey::new(key.to_json()?),
            value: value.to_json()?,
        }))
    }

    /// Run against one document, logging and discarding any failure
    pub fn emit_for(&self, document: &Document, meta: &DocMeta) -> Option<Emission> {
        match self.run(document, meta) {
            Ok(emission) => emission,
            Err(e) => {
                warn!(doc_id = %meta.id, error = %e, "map function failed, document not indexed");
                None
            }
        }
    }
}

/// Compile-and-run evaluator
///
/// Convenience for one-off evaluations. Views compile once and use
/// [`MapFunction`] directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapEvaluator {
    limits: Limits,
}

impl MapEvaluator {
    /// Evaluator with the given bounds
    pub fn new(limits: Limits) -> Self {
        MapEvaluator { limits }
    }

    /// Bounds applied to each evaluation
    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Compile `source` into a reusable function
    pub fn compile(&self, source: &str) -> ScriptResult<MapFunction> {
        MapFunction::compile(source, self.limits)
    }

    /// Evaluate `source` against one document
    ///
    /// Syntax errors, runtime errors and budget exhaustion are logged and
    /// reported as no emission.
    pub fn evaluate(&self, source: &str, document: &Document, meta: &DocMeta) -> Option<Emission> {
        match self.compile(source) {
            Ok(function) => function.emit_for(document, meta),
            Err(e) => {
                warn!(doc_id = %meta.id, error = %e, "map function failed to compile");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person(gender: &str) -> Document {
        Document::from(json!({"name": "x", "gender": gender}))
    }

    #[test]
    fn test_evaluate_gender() {
        let eval = MapEvaluator::default();
        let out = eval.evaluate(
            "function (doc, meta) { emit(doc.gender, null); }",
            &person("Female"),
            &DocMeta::new("p1"),
        );
        assert_eq!(
            out,
            Some(Emission {
                key: ViewKey::from("Female"),
                value: json!(null)
            })
        );
    }

    #[test]
    fn test_text_document_holding_json() {
        let eval = MapEvaluator::default();
        let doc = Document::from(r#"{"gender": "Male"}"#);
        let out = eval.evaluate("function (doc) { emit(doc.gender, 1) }", &doc, &DocMeta::new("p"));
        assert_eq!(out.map(|e| e.key), Some(ViewKey::from("Male")));
    }

    #[test]
    fn test_failures_degrade_to_none() {
        let eval = MapEvaluator::default();
        let meta = DocMeta::new("p");
        // syntax error
        assert_eq!(eval.evaluate("function (doc { emit(1, 1) }", &person("Male"), &meta), None);
        // runtime error
        let runtime = "function (doc) { emit(doc.a.b, 1) }";
        assert_eq!(eval.evaluate(runtime, &person("Male"), &meta), None);
        // unserializable emission
        assert_eq!(eval.evaluate("function (doc) { emit(emit, 1) }", &person("Male"), &meta), None);
        // plain text document with a field lookup
        assert_eq!(
            eval.evaluate("function (doc) { emit(doc.gender.x, 1) }", &Document::from("OK"), &meta),
            None
        );
    }

    #[test]
    fn test_oversized_functions_degrade_to_none() {
        let eval = MapEvaluator::default();
        let meta = DocMeta::new("p");
        let chain = format!("function (doc) {{ emit(1{}, null) }}", "+1".repeat(100_000));
        assert_eq!(eval.evaluate(&chain, &person("Male"), &meta), None);

        let doubling = format!(
            "function (doc) {{ var s = doc.gender; {} emit(s, null) }}",
            "s = s + s; ".repeat(60)
        );
        assert_eq!(eval.evaluate(&doubling, &person("Male"), &meta), None);
    }

    #[test]
    fn test_run_reports_errors() {
        let f =
            MapFunction::compile("function (doc) { emit(doc.a.b, 1) }", Limits::default()).unwrap();
        let err = f.run(&person("Male"), &DocMeta::new("p")).unwrap_err();
        assert!(matches!(err, ScriptError::Runtime(_)));
    }

    #[test]
    fn test_compiled_function_is_reusable() {
        let source = "function (doc, meta) { emit(meta.id, doc.gender) }";
        let f = MapFunction::compile(source, Limits::default()).unwrap();
        for i in 0..3 {
            let id = format!("p{}", i);
            let out = f.emit_for(&person("Male"), &DocMeta::new(id.clone())).unwrap();
            assert_eq!(out.key, ViewKey::from(id));
            assert_eq!(out.value, json!("Male"));
        }
        assert!(f.source().contains("meta.id"));
    }

    #[test]
    fn test_compiled_function_is_shareable_across_threads() {
        let source = "function (doc) { emit(doc.n * 2, null) }";
        let f = Arc::new(MapFunction::compile(source, Limits::default()).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let f = Arc::clone(&f);
                std::thread::spawn(move || {
                    let doc = Document::from(json!({ "n": n }));
                    f.emit_for(&doc, &DocMeta::new(n.to_string())).map(|e| e.key)
                })
            })
            .collect();
        for (n, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), Some(ViewKey::from((n * 2) as i64)));
        }
    }
}
