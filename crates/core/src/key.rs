//! Emitted view keys and their collation
//!
//! View indexes are ordered maps keyed by whatever a map function emitted.
//! [`ViewKey`] wraps the emitted JSON value and gives it a total order so
//! range scans are well defined across mixed types:
//!
//! | Rank | Type | Ordering within type |
//! |------|------|----------------------|
//! | 0 | `null` | - |
//! | 1 | `false` | - |
//! | 2 | `true` | - |
//! | 3 | numbers | numeric |
//! | 4 | strings | Unicode code point |
//! | 5 | arrays | element-wise, then length |
//! | 6 | objects | sorted (key, value) pairs, then length |
//!
//! Equality follows the same order, so `1` and `1.0` are the same key.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Deref;

/// A key emitted by a map function
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewKey(Value);

impl ViewKey {
    /// Wrap a JSON value
    pub fn new(value: Value) -> Self {
        ViewKey(value)
    }

    /// The `null` key, lowest in collation order
    pub fn null() -> Self {
        ViewKey(Value::Null)
    }

    /// Borrow the underlying JSON value
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Unwrap into the underlying JSON value
    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl Deref for ViewKey {
    type Target = Value;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Value> for ViewKey {
    fn from(v: Value) -> Self {
        ViewKey(v)
    }
}

impl From<&str> for ViewKey {
    fn from(s: &str) -> Self {
        ViewKey(Value::String(s.to_string()))
    }
}

impl From<String> for ViewKey {
    fn from(s: String) -> Self {
        ViewKey(Value::String(s))
    }
}

impl From<i64> for ViewKey {
    fn from(n: i64) -> Self {
        ViewKey(Value::from(n))
    }
}

impl From<i32> for ViewKey {
    fn from(n: i32) -> Self {
        ViewKey(Value::from(n))
    }
}

impl From<f64> for ViewKey {
    fn from(n: f64) -> Self {
        // Non-finite numbers have no JSON form
        ViewKey(Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null))
    }
}

impl From<bool> for ViewKey {
    fn from(b: bool) -> Self {
        ViewKey(Value::Bool(b))
    }
}

impl PartialEq for ViewKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ViewKey {}

impl PartialOrd for ViewKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ViewKey {
    fn cmp(&self, other: &Self) -> Ordering {
        collate(&self.0, &other.0)
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(false) => 1,
        Value::Bool(true) => 2,
        Value::Number(_) => 3,
        Value::String(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}

fn as_integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

fn as_float(n: &Number) -> f64 {
    n.as_f64().unwrap_or(f64::NAN)
}

/// Exact comparison of an integer against a float
///
/// Casting the integer to `f64` would round above 2^53 and make distinct
/// integers equal to the same float.
fn compare_integer_float(i: i128, f: f64) -> Ordering {
    const LOWEST: f64 = -9_223_372_036_854_775_808.0; // -2^63
    const PAST_HIGHEST: f64 = 18_446_744_073_709_551_616.0; // 2^64

    if f.is_nan() {
        return Ordering::Less;
    }
    if f < LOWEST {
        return Ordering::Greater;
    }
    if f >= PAST_HIGHEST {
        return Ordering::Less;
    }
    // within the integer range the truncated float is exact
    let whole = f.trunc();
    i.cmp(&(whole as i128)).then_with(|| {
        if f > whole {
            Ordering::Less
        } else if f < whole {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    })
}

fn compare_numbers(a: &Number, b: &Number) -> Ordering {
    match (as_integer(a), as_integer(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(x), None) => compare_integer_float(x, as_float(b)),
        (None, Some(y)) => compare_integer_float(y, as_float(a)).reverse(),
        (None, None) => {
            let (x, y) = (as_float(a), as_float(b));
            // -0.0 and 0.0 are the same key
            x.partial_cmp(&y).unwrap_or_else(|| x.total_cmp(&y))
        }
    }
}

/// Total order over JSON values used for view keys
pub fn collate(a: &Value, b: &Value) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let ord = collate(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => {
            // serde_json maps iterate in key order
            for ((lk, lv), (rk, rv)) in x.iter().zip(y.iter()) {
                let ord = lk.cmp(rk).then_with(|| collate(lv, rv));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => Ordering::Equal,
    }
}
