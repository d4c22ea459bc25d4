//! Runtime values, as seen by render-time guards.
//!
//! A [`Context`] is what the renderer hands a template: variable name to
//! [`Value`]. Values can be built directly or converted from JSON.

use std::collections::BTreeMap;
use std::fmt;

/// Render context: variable name → value.
pub type Context = BTreeMap<String, Value>;

/// Key of an array entry.
///
/// String keys that spell a canonical decimal integer are stored as
/// integers, the way the runtime normalizes them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl Key {
    pub fn as_value(&self) -> Value {
        match self {
            Key::Int(i) => Value::Int(*i),
            Key::Str(s) => Value::String(s.clone()),
        }
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        if is_canonical_int(s) {
            if let Ok(i) = s.parse() {
                return Key::Int(i);
            }
        }
        Key::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::from(s.as_str())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{i}"),
            Key::Str(s) => write!(f, "{s}"),
        }
    }
}

/// `0`, `42`, `-7`; not `007`, `-0`, `+1` or `1.0`.
fn is_canonical_int(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return false;
    }
    !(s.starts_with('-') && digits == "0")
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Ordered map; lists use keys `0..n`.
    Array(Vec<(Key, Value)>),
    /// An instance of `class`. `entries` is set when the object is traversable.
    Object {
        class: String,
        entries: Option<Vec<(Key, Value)>>,
    },
}

impl Value {
    /// A plain (non-traversable) object of the given class.
    pub fn object(class: impl Into<String>) -> Self {
        Value::Object {
            class: class.into(),
            entries: None,
        }
    }

    /// A traversable object, e.g. a collection class.
    pub fn traversable(class: impl Into<String>, entries: Vec<(Key, Value)>) -> Self {
        Value::Object {
            class: class.into(),
            entries: Some(entries),
        }
    }

    /// A list with keys `0..n`.
    pub fn list(items: Vec<Value>) -> Self {
        Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (Key::Int(i as i64), v))
                .collect(),
        )
    }

    pub fn map<K: Into<Key>>(entries: Vec<(K, Value)>) -> Self {
        Value::Array(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Entries to iterate over, if the value is iterable at all.
    pub fn entries(&self) -> Option<&[(Key, Value)]> {
        match self {
            Value::Array(entries) => Some(entries),
            Value::Object {
                entries: Some(entries),
                ..
            } => Some(entries),
            _ => None,
        }
    }

    pub fn is_iterable(&self) -> bool {
        self.entries().is_some()
    }

    /// Short runtime type name, for logs.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object { class, .. } => class,
        }
    }

    /// Build a render context from a JSON object. Anything else yields an
    /// empty context.
    pub fn context_from_json(json: &serde_json::Value) -> Context {
        match json {
            serde_json::Value::Object(map) => map
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v)))
                .collect(),
            _ => Context::new(),
        }
    }
}

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::list(items.iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Array(
                map.iter()
                    .map(|(k, v)| (Key::from(k.as_str()), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from(&json)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_string_keys_normalize() {
        assert_eq!(Key::from("12"), Key::Int(12));
        assert_eq!(Key::from("-3"), Key::Int(-3));
        assert_eq!(Key::from("0"), Key::Int(0));
        assert_eq!(Key::from("012"), Key::Str("012".into()));
        assert_eq!(Key::from("-0"), Key::Str("-0".into()));
        assert_eq!(Key::from("1.5"), Key::Str("1.5".into()));
        assert_eq!(Key::from("abc"), Key::Str("abc".into()));
    }

    #[test]
    fn test_from_json_shapes() {
        let v = Value::from(json!({"a": 1, "7": [true, null], "f": 1.5}));
        let Value::Array(entries) = v else {
            panic!("expected array");
        };
        assert!(entries.contains(&(Key::Str("a".into()), Value::Int(1))));
        assert!(entries.contains(&(Key::Str("f".into()), Value::Float(1.5))));
        assert!(entries.contains(&(
            Key::Int(7),
            Value::list(vec![Value::Bool(true), Value::Null])
        )));
    }

    #[test]
    fn test_type_name() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::Int(1).type_name(), "int");
        assert_eq!(Value::string("x").type_name(), "string");
        assert_eq!(Value::list(vec![]).type_name(), "array");
        assert_eq!(Value::object("App\\Widget").type_name(), "App\\Widget");
    }

    #[test]
    fn test_plain_object_is_not_iterable() {
        assert!(!Value::object("App\\Widget").is_iterable());
        assert!(Value::traversable("App\\Collection", vec![]).is_iterable());
        assert!(Value::list(vec![]).is_iterable());
        assert!(!Value::string("x").is_iterable());
    }

    #[test]
    fn test_context_from_json() {
        let ctx = Value::context_from_json(&json!({"foo": "bar", "n": null}));
        assert_eq!(ctx.get("foo"), Some(&Value::string("bar")));
        assert_eq!(ctx.get("n"), Some(&Value::Null));
        assert!(Value::context_from_json(&json!([1, 2])).is_empty());
    }
}
