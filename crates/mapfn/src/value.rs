//! Runtime values seen by map functions
//!
//! Values are immutable once built (the language has no member assignment),
//! so arrays and objects are shared through `Rc` and cloning is cheap.
//! Everything here lives inside a single evaluation and never crosses
//! threads.
//!
//! Sharing means `a = [a, a]` doubles what the value flattens to without
//! copying anything, so composites carry their flattened size and depth.

use crate::error::{ScriptError, ScriptResult};
use crate::parser::format_number;
use std::collections::BTreeMap;
use std::ops::Deref;
use std::rc::Rc;

/// Host functions reachable from map functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `emit(key, value)`
    Emit,
    /// The `Array` namespace object
    ArrayNamespace,
    /// `Array.isArray(x)`
    IsArray,
}

/// An array or object together with what it flattens to
#[derive(Debug)]
pub struct Measured<T> {
    inner: T,
    size: usize,
    depth: usize,
}

impl<T> Deref for Measured<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

/// A value inside a running map function
#[derive(Debug, Clone)]
pub enum ScriptValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Array(Rc<Measured<Vec<ScriptValue>>>),
    Object(Rc<Measured<BTreeMap<String, ScriptValue>>>),
    Builtin(Builtin),
}

impl ScriptValue {
    pub fn string(s: impl Into<String>) -> Self {
        ScriptValue::String(Rc::from(s.into()))
    }

    pub fn array(items: Vec<ScriptValue>) -> Self {
        let size = items
            .iter()
            .fold(1usize, |acc, item| acc.saturating_add(item.size()));
        let depth = 1 + items.iter().map(ScriptValue::depth).max().unwrap_or(0);
        ScriptValue::Array(Rc::new(Measured {
            inner: items,
            size,
            depth,
        }))
    }

    pub fn object(map: BTreeMap<String, ScriptValue>) -> Self {
        let size = map.iter().fold(1usize, |acc, (k, v)| {
            acc.saturating_add(k.len()).saturating_add(v.size())
        });
        let depth = 1 + map.values().map(ScriptValue::depth).max().unwrap_or(0);
        ScriptValue::Object(Rc::new(Measured {
            inner: map,
            size,
            depth,
        }))
    }

    /// Rough byte count of this value once flattened to a string or JSON
    ///
    /// Shared children count once per reference.
    pub fn size(&self) -> usize {
        match self {
            ScriptValue::String(s) => s.len().saturating_add(1),
            ScriptValue::Array(items) => items.size,
            ScriptValue::Object(map) => map.size,
            _ => 1,
        }
    }

    /// Nesting depth, 0 for scalars
    pub fn depth(&self) -> usize {
        match self {
            ScriptValue::Array(items) => items.depth,
            ScriptValue::Object(map) => map.depth,
            _ => 0,
        }
    }

    /// Convert a JSON value into a script value
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ScriptValue::Null,
            serde_json::Value::Bool(b) => ScriptValue::Bool(*b),
            serde_json::Value::Number(n) => ScriptValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => ScriptValue::string(s.as_str()),
            serde_json::Value::Array(items) => {
                ScriptValue::array(items.iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(map) => ScriptValue::object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert to JSON the way `JSON.stringify` would
    ///
    /// `undefined` becomes `null` (and is dropped from objects), non-finite
    /// numbers become `null`, and host functions cannot be converted.
    pub fn to_json(&self) -> ScriptResult<serde_json::Value> {
        Ok(match self {
            ScriptValue::Undefined | ScriptValue::Null => serde_json::Value::Null,
            ScriptValue::Bool(b) => serde_json::Value::Bool(*b),
            ScriptValue::Number(n) => number_to_json(*n),
            ScriptValue::String(s) => serde_json::Value::String(s.to_string()),
            ScriptValue::Array(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(|v| v.to_json())
                    .collect::<ScriptResult<Vec<_>>>()?,
            ),
            ScriptValue::Object(map) => {
                let mut out = serde_json::Map::new();
                for (k, v) in map.iter() {
                    if matches!(v, ScriptValue::Undefined) {
                        continue;
                    }
                    out.insert(k.clone(), v.to_json()?);
                }
                serde_json::Value::Object(out)
            }
            ScriptValue::Builtin(_) => {
                return Err(ScriptError::runtime("functions cannot be serialized"))
            }
        })
    }

    pub fn truthy(&self) -> bool {
        match self {
            ScriptValue::Undefined | ScriptValue::Null => false,
            ScriptValue::Bool(b) => *b,
            ScriptValue::Number(n) => *n != 0.0 && !n.is_nan(),
            ScriptValue::String(s) => !s.is_empty(),
            ScriptValue::Array(_) | ScriptValue::Object(_) | ScriptValue::Builtin(_) => true,
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            ScriptValue::Undefined => "undefined",
            ScriptValue::Null | ScriptValue::Array(_) | ScriptValue::Object(_) => "object",
            ScriptValue::Bool(_) => "boolean",
            ScriptValue::Number(_) => "number",
            ScriptValue::String(_) => "string",
            ScriptValue::Builtin(_) => "function",
        }
    }

    pub fn to_js_string(&self) -> String {
        match self {
            ScriptValue::Undefined => "undefined".to_string(),
            ScriptValue::Null => "null".to_string(),
            ScriptValue::Bool(b) => b.to_string(),
            ScriptValue::Number(n) => format_number(*n),
            ScriptValue::String(s) => s.to_string(),
            ScriptValue::Array(items) => items
                .iter()
                .map(|v| match v {
                    ScriptValue::Undefined | ScriptValue::Null => String::new(),
                    other => other.to_js_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            ScriptValue::Object(_) => "[object Object]".to_string(),
            ScriptValue::Builtin(_) => "function () { [native code] }".to_string(),
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            ScriptValue::Undefined => f64::NAN,
            ScriptValue::Null => 0.0,
            ScriptValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            ScriptValue::Number(n) => *n,
            ScriptValue::String(s) => string_to_number(s),
            ScriptValue::Array(_) => string_to_number(&self.to_js_string()),
            ScriptValue::Object(_) | ScriptValue::Builtin(_) => f64::NAN,
        }
    }

    /// `===`
    pub fn strict_eq(&self, other: &ScriptValue) -> bool {
        match (self, other) {
            (ScriptValue::Undefined, ScriptValue::Undefined) => true,
            (ScriptValue::Null, ScriptValue::Null) => true,
            (ScriptValue::Bool(a), ScriptValue::Bool(b)) => a == b,
            (ScriptValue::Number(a), ScriptValue::Number(b)) => a == b,
            (ScriptValue::String(a), ScriptValue::String(b)) => a == b,
            (ScriptValue::Array(a), ScriptValue::Array(b)) => Rc::ptr_eq(a, b),
            (ScriptValue::Object(a), ScriptValue::Object(b)) => Rc::ptr_eq(a, b),
            (ScriptValue::Builtin(a), ScriptValue::Builtin(b)) => a == b,
            _ => false,
        }
    }

    /// `==`
    pub fn loose_eq(&self, other: &ScriptValue) -> bool {
        use ScriptValue::*;
        match (self, other) {
            (Undefined | Null, Undefined | Null) => true,
            (Undefined | Null, _) | (_, Undefined | Null) => false,
            (Number(_), String(_)) | (String(_), Number(_)) => {
                self.to_number() == other.to_number()
            }
            (Bool(_), _) => Number(self.to_number()).loose_eq(other),
            (_, Bool(_)) => self.loose_eq(&Number(other.to_number())),
            (Array(_) | Object(_), Number(_) | String(_)) => {
                ScriptValue::string(self.to_js_string()).loose_eq(other)
            }
            (Number(_) | String(_), Array(_) | Object(_)) => {
                self.loose_eq(&ScriptValue::string(other.to_js_string()))
            }
            _ => self.strict_eq(other),
        }
    }
}

fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ => trimmed.parse::<f64>().unwrap_or(f64::NAN),
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n == n.trunc() && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}
