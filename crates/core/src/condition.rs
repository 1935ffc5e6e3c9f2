//! Query condition grammar: `FIELD OP VALUE`.
//!
//! One condition per string, e.g. `"pmcid == PMC13901"`. The parser locates
//! the first occurrence of an operator token as a literal substring split
//! point — it is not a tokenizer, so operator text must not appear inside the
//! field or value. Tokens are tried longest-first; that ordering is a
//! correctness requirement, not an optimization (`count in [1,2]` must split
//! on `in`, while `flags not-in [1]` and `tags array-contains-any [..]` must
//! not be mis-split on the embedded `in`).
//!
//! Values run through [`simplest_type`], a total inference step turning
//! boolean spellings, null spellings, numbers, and JSON literals into typed
//! values and leaving everything else a string.

use std::fmt;

use crate::{Error, Result, Value};

/// Comparison and containment operators understood by the condition grammar.
///
/// Each backing store supports a subset; the parser validates the operator
/// against the active store's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `in` — field value is a member of the given list
    In,
    /// `not-in` — field value is not a member of the given list
    NotIn,
    /// `array-contains` — field array contains the given value
    ArrayContains,
    /// `array-contains-any` — field array intersects the given list
    ArrayContainsAny,
}

impl Op {
    /// Every operator, in no particular order.
    pub const ALL: [Op; 10] = [
        Op::Eq,
        Op::Ne,
        Op::Lt,
        Op::Le,
        Op::Gt,
        Op::Ge,
        Op::In,
        Op::NotIn,
        Op::ArrayContains,
        Op::ArrayContainsAny,
    ];

    /// The literal token as it appears in a condition string.
    pub fn token(&self) -> &'static str {
        match self {
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::In => "in",
            Op::NotIn => "not-in",
            Op::ArrayContains => "array-contains",
            Op::ArrayContainsAny => "array-contains-any",
        }
    }

    /// True for operators whose right-hand side must be a list.
    pub fn wants_list(&self) -> bool {
        matches!(self, Op::In | Op::NotIn | Op::ArrayContainsAny)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Longest-token-first match order. Two-character symbolic tokens come before
/// `in` so `version == inprint` never splits on the value text.
const MATCH_ORDER: [Op; 10] = [
    Op::ArrayContainsAny,
    Op::ArrayContains,
    Op::NotIn,
    Op::Eq,
    Op::Ne,
    Op::Le,
    Op::Ge,
    Op::In,
    Op::Lt,
    Op::Gt,
];

/// A parsed filter clause: field, operator, typed value.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Document field the clause applies to (dotted paths descend objects)
    pub field: String,
    /// Comparison operator
    pub op: Op,
    /// Right-hand value, after type inference
    pub value: Value,
}

impl Condition {
    /// Parse one `FIELD OP VALUE` string against a store's supported
    /// operator list.
    ///
    /// Field and value are trimmed of surrounding whitespace. Empty field,
    /// empty value, an unrecognized operator, and a recognized-but-
    /// unsupported operator are four distinct errors, each carrying the
    /// offending condition string.
    pub fn parse(condition: &str, supported: &[Op], backend: &'static str) -> Result<Condition> {
        let trimmed = condition.trim();
        for op in MATCH_ORDER {
            let Some(at) = trimmed.find(op.token()) else {
                continue;
            };
            let field = trimmed[..at].trim();
            let value = trimmed[at + op.token().len()..].trim();
            if field.is_empty() {
                return Err(Error::EmptyConditionField {
                    condition: condition.to_string(),
                });
            }
            if value.is_empty() {
                return Err(Error::EmptyConditionValue {
                    condition: condition.to_string(),
                });
            }
            if !supported.contains(&op) {
                return Err(Error::UnsupportedOperator {
                    op: op.token(),
                    backend,
                    condition: condition.to_string(),
                });
            }
            return Ok(Condition {
                field: field.to_string(),
                op,
                value: simplest_type(value),
            });
        }
        Err(Error::UnknownOperator {
            condition: condition.to_string(),
        })
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {:?}", self.field, self.op, self.value)
    }
}

/// Infer the simplest typed value for a string.
///
/// Boolean spellings (`y/yes/true/on`, `n/no/false/off`) and null spellings
/// (`none/null`) are recognized case-insensitively, then integers, then
/// finite floats, then JSON literal structures (`[`, `{`, `"` prefixes).
/// Anything else comes back as the original string. Total — never fails.
pub fn simplest_type(s: &str) -> Value {
    match s.to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" | "on" => return Value::Bool(true),
        "n" | "no" | "false" | "off" => return Value::Bool(false),
        "none" | "null" => return Value::Null,
        _ => {}
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        // `inf`/`nan` spellings stay strings
        if f.is_finite() {
            return Value::Float(f);
        }
    }
    if s.starts_with('[') || s.starts_with('{') || s.starts_with('"') {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(s) {
            return Value::from(json);
        }
    }
    Value::String(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simplest_type_booleans() {
        for s in ["true", "Yes", "on", "Y"] {
            assert_eq!(simplest_type(s), Value::Bool(true), "{s}");
        }
        for s in ["false", "No", "off", "n"] {
            assert_eq!(simplest_type(s), Value::Bool(false), "{s}");
        }
    }

    #[test]
    fn test_simplest_type_null() {
        assert_eq!(simplest_type("null"), Value::Null);
        assert_eq!(simplest_type("None"), Value::Null);
    }

    #[test]
    fn test_simplest_type_numbers() {
        assert_eq!(simplest_type("42"), Value::Int(42));
        assert_eq!(simplest_type("-7"), Value::Int(-7));
        assert_eq!(simplest_type("3.14"), Value::Float(3.14));
        assert_eq!(simplest_type("inf"), Value::String("inf".to_string()));
    }

    #[test]
    fn test_simplest_type_structures() {
        assert_eq!(
            simplest_type("[1, 2]"),
            Value::Array(vec![Value::Int(1), Value::Int(2)])
        );
        assert_eq!(simplest_type("\"quoted\""), Value::from("quoted"));
        // Broken JSON stays a string
        assert_eq!(simplest_type("[1, 2"), Value::from("[1, 2"));
    }

    #[test]
    fn test_simplest_type_plain_string() {
        assert_eq!(simplest_type("hello"), Value::from("hello"));
        assert_eq!(simplest_type("PMC13901"), Value::from("PMC13901"));
    }

    #[test]
    fn test_parse_basic_condition() {
        let c = Condition::parse("pmcid == PMC13901", &Op::ALL, "test").unwrap();
        assert_eq!(c.field, "pmcid");
        assert_eq!(c.op, Op::Eq);
        assert_eq!(c.value, Value::from("PMC13901"));
    }

    #[test]
    fn test_parse_whitespace_insensitive() {
        let spaced = Condition::parse("field == value", &Op::ALL, "test").unwrap();
        let tight = Condition::parse("field==value", &Op::ALL, "test").unwrap();
        assert_eq!(spaced, tight);
    }

    #[test]
    fn test_parse_prefers_longest_operator() {
        let c = Condition::parse("count in [1,2]", &Op::ALL, "test").unwrap();
        assert_eq!(c.op, Op::In);
        assert_eq!(c.value, Value::Array(vec![Value::Int(1), Value::Int(2)]));

        let c = Condition::parse("flags not-in [1]", &Op::ALL, "test").unwrap();
        assert_eq!(c.op, Op::NotIn);

        let c = Condition::parse("tags array-contains-any [\"a\"]", &Op::ALL, "test").unwrap();
        assert_eq!(c.op, Op::ArrayContainsAny);

        let c = Condition::parse("tags array-contains oa", &Op::ALL, "test").unwrap();
        assert_eq!(c.op, Op::ArrayContains);
    }

    #[test]
    fn test_parse_le_not_split_as_lt() {
        let c = Condition::parse("version <= 3", &Op::ALL, "test").unwrap();
        assert_eq!(c.op, Op::Le);
        assert_eq!(c.value, Value::Int(3));
    }

    #[test]
    fn test_parse_value_with_embedded_in() {
        // `==` wins over the `in` inside the value text
        let c = Condition::parse("status == inprint", &Op::ALL, "test").unwrap();
        assert_eq!(c.op, Op::Eq);
        assert_eq!(c.value, Value::from("inprint"));
    }

    #[test]
    fn test_parse_typed_values() {
        let c = Condition::parse("version > 2", &Op::ALL, "test").unwrap();
        assert_eq!(c.value, Value::Int(2));
        let c = Condition::parse("is_oa == yes", &Op::ALL, "test").unwrap();
        assert_eq!(c.value, Value::Bool(true));
    }

    #[test]
    fn test_parse_empty_field() {
        let err = Condition::parse("  == value", &Op::ALL, "test").unwrap_err();
        assert!(matches!(err, Error::EmptyConditionField { .. }));
    }

    #[test]
    fn test_parse_empty_value() {
        let err = Condition::parse("field ==  ", &Op::ALL, "test").unwrap_err();
        assert!(matches!(err, Error::EmptyConditionValue { .. }));
    }

    #[test]
    fn test_parse_unknown_operator() {
        let err = Condition::parse("field ~ value", &Op::ALL, "test").unwrap_err();
        assert!(matches!(err, Error::UnknownOperator { .. }));
    }

    #[test]
    fn test_parse_unsupported_operator() {
        let supported = [Op::Eq, Op::Ne];
        let err = Condition::parse("tags array-contains oa", &supported, "limited").unwrap_err();
        match err {
            Error::UnsupportedOperator { op, backend, .. } => {
                assert_eq!(op, "array-contains");
                assert_eq!(backend, "limited");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
