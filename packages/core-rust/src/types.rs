use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Generic runtime value held by a form field.
///
/// Supports all JSON-compatible types plus a native date. Used as the value
/// type of [`FormValues`], as the literal of a visibility condition, and as
/// the input and output of every validation brick.
///
/// Serializes untagged so that form definitions and value sets round-trip
/// through plain JSON. Dates arriving over JSON are strings; only code that
/// constructs a [`Value::Date`] directly (or a brick that normalizes a date)
/// produces the native variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// JSON null.
    Null,
    /// JSON boolean.
    Bool(bool),
    /// JSON integer (signed 64-bit).
    Int(i64),
    /// JSON floating-point (64-bit IEEE 754).
    Float(f64),
    /// JSON string (UTF-8).
    String(String),
    /// Native calendar date-time without zone information.
    Date(NaiveDateTime),
    /// JSON array (ordered sequence of values).
    Array(Vec<Value>),
    /// JSON object (ordered map of string keys to values).
    /// Uses `BTreeMap` for deterministic serialization order.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Returns the string slice if this is a [`Value::String`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the map if this is a [`Value::Map`].
    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the elements if this is a [`Value::Array`].
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Builds a number value, preferring [`Value::Int`] for integral input.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn number(n: f64) -> Self {
        if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
            Self::Int(n as i64)
        } else {
            Self::Float(n)
        }
    }

    /// Numeric coercion with loose-typing semantics.
    ///
    /// - `null` and `false` are 0, `true` is 1
    /// - strings are trimmed; empty is 0, unparsable is `NaN`
    /// - a date is its millisecond timestamp
    /// - an empty array is 0, a one-element array coerces its element
    /// - everything else is `NaN`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Null | Self::Bool(false) => 0.0,
            Self::Bool(true) => 1.0,
            Self::Int(i) => *i as f64,
            Self::Float(f) => *f,
            Self::String(s) => parse_number(s),
            Self::Date(d) => d.and_utc().timestamp_millis() as f64,
            Self::Array(items) => match items.as_slice() {
                [] => 0.0,
                [single] => single.to_number(),
                _ => f64::NAN,
            },
            Self::Map(_) => f64::NAN,
        }
    }

    /// Strict equality against a literal.
    ///
    /// Scalars compare by value (integers and floats compare numerically).
    /// Arrays and maps never equal a literal: they compare by identity in
    /// the loosely-typed world the configs are authored in, and a config
    /// literal is never the same instance as a live value.
    #[must_use]
    #[allow(clippy::float_cmp, clippy::cast_precision_loss)]
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Int(a), Self::Float(b)) | (Self::Float(b), Self::Int(a)) => (*a as f64) == *b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            _ => false,
        }
    }

    /// Whether this value counts as "not filled in".
    ///
    /// `null`, the empty string, the empty array and the empty object are
    /// absent. This is the one rule used everywhere a field's presence is
    /// checked, including non-scalar values such as multi-selects, file
    /// lists and location objects.
    #[must_use]
    pub fn is_empty_like(&self) -> bool {
        match self {
            Self::Null => true,
            Self::String(s) => s.is_empty(),
            Self::Array(items) => items.is_empty(),
            Self::Map(m) => m.is_empty(),
            _ => false,
        }
    }

    /// Reduces a value to a lookup key.
    ///
    /// Objects reduce to their `value` entry, falling back to `id`; all
    /// other values use their display string. `null` and the empty string
    /// have no key.
    #[must_use]
    pub fn key_string(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::String(s) if s.is_empty() => None,
            Self::Map(m) => m
                .get("value")
                .filter(|v| !matches!(v, Self::Null))
                .or_else(|| m.get("id"))
                .map(ToString::to_string),
            other => Some(other.to_string()),
        }
    }
}

/// Display string with loose-typing semantics (`1.0` prints as `1`).
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(n) => {
                if n.is_nan() {
                    f.write_str("NaN")
                } else if n.fract() == 0.0 && n.abs() < 1e21 {
                    write!(f, "{n:.0}")
                } else {
                    write!(f, "{n}")
                }
            }
            Self::String(s) => f.write_str(s),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%dT%H:%M:%S%.3f")),
            Self::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Self::Map(_) => f.write_str("[object Object]"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(d: NaiveDateTime) -> Self {
        Self::Date(d)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

fn parse_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    // Rust accepts "inf"/"nan" spellings that loose numeric coercion rejects.
    if trimmed.chars().any(char::is_alphabetic) && !trimmed.contains(['e', 'E']) {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

// ---------------------------------------------------------------------------
// FormValues
// ---------------------------------------------------------------------------

/// Mapping from field name to its current value.
///
/// A field with no entry is "undefined"; this is distinct from an entry
/// holding [`Value::Null`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormValues(BTreeMap<String, Value>);

impl FormValues {
    /// Creates an empty value set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of `name`, if one is set.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Sets `name` to `value`, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(name.into(), value)
    }

    /// Sets `name` to `value`, or removes it when `value` is `None`.
    pub fn set(&mut self, name: &str, value: Option<Value>) -> Option<Value> {
        match value {
            Some(v) => self.0.insert(name.to_string(), v),
            None => self.0.remove(name),
        }
    }

    /// Removes `name`, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    /// Whether `name` has an entry (including an explicit null).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FormValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Which validation layer produced a [`FieldError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// A value failed its brick's constraint.
    Schema,
    /// A visible, required field was left empty.
    Manual,
}

/// A field-scoped, human-readable validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Layer that produced the error.
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    /// Message shown next to the field.
    pub message: String,
}

impl FieldError {
    /// Creates a schema-layer error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Schema,
            message: message.into(),
        }
    }

    /// Creates a manual-layer error.
    pub fn manual(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Manual,
            message: message.into(),
        }
    }
}

/// Mapping from field name to its error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorMap(BTreeMap<String, FieldError>);

impl ErrorMap {
    /// Creates an empty error map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the error for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldError> {
        self.0.get(name)
    }

    /// Records an error for `name`, replacing any existing one.
    pub fn insert(&mut self, name: impl Into<String>, error: FieldError) {
        self.0.insert(name.into(), error);
    }

    /// Removes the error for `name`.
    pub fn remove(&mut self, name: &str) -> Option<FieldError> {
        self.0.remove(name)
    }

    /// Merges `other` into `self`. Entries of `other` win on collision.
    pub fn merge(&mut self, other: ErrorMap) {
        self.0.extend(other.0);
    }

    /// Whether `name` has an error.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Number of fields with errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no field has an error.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Removes every error.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Iterates errors in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldError)> {
        self.0.iter()
    }
}

impl IntoIterator for ErrorMap {
    type Item = (String, FieldError);
    type IntoIter = std::collections::btree_map::IntoIter<String, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_coercion_of_strings() {
        assert_eq!(Value::from("60").to_number(), 60.0);
        assert_eq!(Value::from("  7.5 ").to_number(), 7.5);
        assert_eq!(Value::from("").to_number(), 0.0);
        assert!(Value::from("abc").to_number().is_nan());
        assert!(Value::from("inf").to_number().is_nan());
        assert_eq!(Value::from("1e3").to_number(), 1000.0);
    }

    #[test]
    fn numeric_coercion_of_non_strings() {
        assert_eq!(Value::Null.to_number(), 0.0);
        assert_eq!(Value::Bool(true).to_number(), 1.0);
        assert_eq!(Value::Array(vec![]).to_number(), 0.0);
        assert_eq!(Value::from(vec!["4"]).to_number(), 4.0);
        assert!(Value::from(vec![1_i64, 2]).to_number().is_nan());
        assert!(Value::Map(BTreeMap::new()).to_number().is_nan());
    }

    #[test]
    fn strict_eq_compares_numbers_across_representations() {
        assert!(Value::Int(3).strict_eq(&Value::Float(3.0)));
        assert!(!Value::from("3").strict_eq(&Value::Int(3)));
        assert!(!Value::from(vec!["a"]).strict_eq(&Value::from(vec!["a"])));
    }

    #[test]
    fn empty_like_values() {
        assert!(Value::Null.is_empty_like());
        assert!(Value::from("").is_empty_like());
        assert!(Value::Array(vec![]).is_empty_like());
        assert!(Value::Map(BTreeMap::new()).is_empty_like());
        assert!(!Value::from(" ").is_empty_like());
        assert!(!Value::Int(0).is_empty_like());
        assert!(!Value::Bool(false).is_empty_like());
    }

    #[test]
    fn key_string_reduces_objects() {
        let mut obj = BTreeMap::new();
        obj.insert("id".to_string(), Value::Int(9));
        assert_eq!(Value::Map(obj.clone()).key_string().as_deref(), Some("9"));
        obj.insert("value".to_string(), Value::from("elec"));
        assert_eq!(Value::Map(obj).key_string().as_deref(), Some("elec"));
        assert_eq!(Value::Float(2.0).key_string().as_deref(), Some("2"));
        assert_eq!(Value::from("").key_string(), None);
        assert_eq!(Value::Null.key_string(), None);
    }

    #[test]
    fn untagged_json_roundtrip() {
        let json = r#"{"a":null,"b":true,"c":3,"d":1.5,"e":"x","f":[1,"y"],"g":{"h":2}}"#;
        let values: FormValues = serde_json::from_str(json).expect("deserialize");
        assert_eq!(values.get("a"), Some(&Value::Null));
        assert_eq!(values.get("c"), Some(&Value::Int(3)));
        assert_eq!(values.get("d"), Some(&Value::Float(1.5)));
        assert_eq!(values.get("e"), Some(&Value::from("x")));
        let back = serde_json::to_string(&values).expect("serialize");
        assert_eq!(back, json);
    }

    #[test]
    fn merge_prefers_incoming_entries() {
        let mut base = ErrorMap::new();
        base.insert("a", FieldError::schema("bad"));
        base.insert("b", FieldError::schema("also bad"));
        let mut manual = ErrorMap::new();
        manual.insert("a", FieldError::manual("A is required"));
        base.merge(manual);
        assert_eq!(base.len(), 2);
        assert_eq!(base.get("a"), Some(&FieldError::manual("A is required")));
    }
}
