//! Document value model.
//!
//! [`Value`] is the recursive variant every document is made of:
//! Null, Bool, Int, Float, String, Bytes, Array, Object. It is a strict
//! superset of JSON — `Bytes` exists so base64-decoded fields can carry raw
//! payloads between transforms without round-tripping through text.
//!
//! Objects use a `BTreeMap` so any serialized form comes out with sorted,
//! deterministic key order.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

/// Canonical document value.
///
/// Different variants are never equal, even when they look alike:
/// `Int(1) != Float(1.0)` and `Bytes(b"x") != String("x")`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point (IEEE-754)
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// Array of values
    Array(Vec<Value>),
    /// Object with string keys, sorted
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Bytes(_) => "Bytes",
            Value::Array(_) => "Array",
            Value::Object(_) => "Object",
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this is an object value
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Get as &str if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is a Float value
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get the object map if this is an Object value
    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Get the object map mutably if this is an Object value
    pub fn as_object_mut(&mut self) -> Option<&mut BTreeMap<String, Value>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Get the array if this is an Array value
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Look up a top-level field on an object document.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.as_object().and_then(|o| o.get(field))
    }

    /// Resolve a dotted path (`meta.journal.issn`) through nested objects.
    ///
    /// A path segment that does not name an object field resolves to `None`.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut current = self;
        for segment in path.split('.') {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }
}

// ============================================================================
// serde_json interop
// ============================================================================

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    // u64 beyond i64 range degrades to float
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(obj) => {
                Value::Object(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::Number(i.into()),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            // Bytes become base64 text so the document stays JSON-safe
            Value::Bytes(b) => serde_json::Value::String(BASE64.encode(b)),
            Value::Array(arr) => {
                serde_json::Value::Array(arr.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Object(obj) => serde_json::Value::Object(
                obj.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(pairs: &[(&str, Value)]) -> Value {
        Value::Object(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Null.type_name(), "Null");
        assert_eq!(Value::Bytes(vec![1]).type_name(), "Bytes");
        assert_eq!(Value::Float(1.0).type_name(), "Float");
    }

    #[test]
    fn test_cross_type_inequality() {
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Bytes(b"x".to_vec()), Value::String("x".to_string()));
    }

    #[test]
    fn test_from_json_numbers() {
        let v = Value::from(serde_json::json!({"a": 1, "b": 2.5}));
        assert_eq!(v.get("a"), Some(&Value::Int(1)));
        assert_eq!(v.get("b"), Some(&Value::Float(2.5)));
    }

    #[test]
    fn test_json_roundtrip_structure() {
        let json = serde_json::json!({
            "pmcid": "PMC13901",
            "version": 3,
            "is_oa": true,
            "issue": null,
            "authors": ["a", "b"],
            "meta": {"journal": {"issn": "1465-5411"}}
        });
        let v = Value::from(json.clone());
        assert_eq!(serde_json::Value::from(v), json);
    }

    #[test]
    fn test_bytes_serialize_as_base64() {
        let v = Value::Bytes(b"hello".to_vec());
        assert_eq!(
            serde_json::Value::from(v),
            serde_json::Value::String("aGVsbG8=".to_string())
        );
    }

    #[test]
    fn test_get_path_nested() {
        let v = obj(&[(
            "meta",
            obj(&[("journal", obj(&[("issn", Value::from("1465-5411"))]))]),
        )]);
        assert_eq!(
            v.get_path("meta.journal.issn"),
            Some(&Value::String("1465-5411".to_string()))
        );
        assert_eq!(v.get_path("meta.journal.title"), None);
        assert_eq!(v.get_path("meta.journal.issn.deeper"), None);
    }

    #[test]
    fn test_get_path_top_level() {
        let v = obj(&[("pmcid", Value::from("PMC13901"))]);
        assert_eq!(v.get_path("pmcid"), v.get("pmcid"));
    }
}
