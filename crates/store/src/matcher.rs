//! Client-side condition evaluation.
//!
//! The Redis and memory adapters have no server-side query engine, so parsed
//! conditions are applied here, one document at a time. Semantics:
//!
//! - a field missing from the document matches nothing, including `!=`
//! - `Int` and `Float` compare numerically across variants
//! - strings order lexicographically; other variant pairs do not order
//! - the membership operators (`in`, `not-in`, `array-contains-any`) expect
//!   a list operand; the adapter validates that before streaming

use std::cmp::Ordering;

use docload_core::{Condition, Op, Value};

/// True when `doc` satisfies `cond`.
pub fn matches(doc: &Value, cond: &Condition) -> bool {
    let Some(target) = doc.get_path(&cond.field) else {
        return false;
    };
    match cond.op {
        Op::Eq => value_eq(target, &cond.value),
        Op::Ne => !value_eq(target, &cond.value),
        Op::Lt => ordered(target, &cond.value, |o| o == Ordering::Less),
        Op::Le => ordered(target, &cond.value, |o| o != Ordering::Greater),
        Op::Gt => ordered(target, &cond.value, |o| o == Ordering::Greater),
        Op::Ge => ordered(target, &cond.value, |o| o != Ordering::Less),
        Op::In => list_of(&cond.value).is_some_and(|l| l.iter().any(|v| value_eq(target, v))),
        Op::NotIn => list_of(&cond.value).is_some_and(|l| !l.iter().any(|v| value_eq(target, v))),
        Op::ArrayContains => target
            .as_array()
            .is_some_and(|a| a.iter().any(|v| value_eq(v, &cond.value))),
        Op::ArrayContainsAny => match (target.as_array(), list_of(&cond.value)) {
            (Some(hay), Some(needles)) => hay
                .iter()
                .any(|h| needles.iter().any(|n| value_eq(h, n))),
            _ => false,
        },
    }
}

/// Ordering key for `order_by`: present fields sort by [`compare`] (ties and
/// unorderable pairs stay put), missing fields sort last.
pub fn order_key(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Equality with numeric cross-variant comparison.
fn value_eq(a: &Value, b: &Value) -> bool {
    match (numeric(a), numeric(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Partial ordering: numeric across Int/Float, lexicographic for strings.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (numeric(a), numeric(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y),
        _ => match (a, b) {
            (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
            _ => None,
        },
    }
}

fn ordered(a: &Value, b: &Value, pred: impl Fn(Ordering) -> bool) -> bool {
    compare(a, b).map(pred).unwrap_or(false)
}

fn numeric(v: &Value) -> Option<f64> {
    match v {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn list_of(v: &Value) -> Option<&[Value]> {
    v.as_array()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docload_core::condition::simplest_type;

    fn doc(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    fn cond(field: &str, op: Op, value: &str) -> Condition {
        Condition {
            field: field.to_string(),
            op,
            value: simplest_type(value),
        }
    }

    #[test]
    fn test_eq_and_ne() {
        let d = doc(serde_json::json!({"pmcid": "PMC13901", "version": 3}));
        assert!(matches(&d, &cond("pmcid", Op::Eq, "PMC13901")));
        assert!(!matches(&d, &cond("pmcid", Op::Eq, "PMC99999")));
        assert!(matches(&d, &cond("pmcid", Op::Ne, "PMC99999")));
        // Missing fields match nothing, != included
        assert!(!matches(&d, &cond("absent", Op::Ne, "x")));
    }

    #[test]
    fn test_numeric_cross_variant() {
        let d = doc(serde_json::json!({"version": 3.0}));
        assert!(matches(&d, &cond("version", Op::Eq, "3")));
        assert!(matches(&d, &cond("version", Op::Ge, "3")));
        assert!(matches(&d, &cond("version", Op::Lt, "3.5")));
        assert!(!matches(&d, &cond("version", Op::Gt, "3")));
    }

    #[test]
    fn test_string_ordering() {
        let d = doc(serde_json::json!({"title": "beta"}));
        assert!(matches(&d, &cond("title", Op::Gt, "alpha")));
        assert!(!matches(&d, &cond("title", Op::Lt, "alpha")));
    }

    #[test]
    fn test_mixed_types_do_not_order() {
        let d = doc(serde_json::json!({"title": "beta"}));
        assert!(!matches(&d, &cond("title", Op::Gt, "1")));
    }

    #[test]
    fn test_membership() {
        let d = doc(serde_json::json!({"version": 2}));
        assert!(matches(&d, &cond("version", Op::In, "[1, 2]")));
        assert!(!matches(&d, &cond("version", Op::In, "[3, 4]")));
        assert!(matches(&d, &cond("version", Op::NotIn, "[3, 4]")));
    }

    #[test]
    fn test_array_contains() {
        let d = doc(serde_json::json!({"tags": ["oa", "retracted"]}));
        assert!(matches(&d, &cond("tags", Op::ArrayContains, "oa")));
        assert!(!matches(&d, &cond("tags", Op::ArrayContains, "new")));
        assert!(matches(
            &d,
            &cond("tags", Op::ArrayContainsAny, "[\"new\", \"oa\"]")
        ));
        assert!(!matches(
            &d,
            &cond("tags", Op::ArrayContainsAny, "[\"new\", \"old\"]")
        ));
        // Scalar target never array-contains
        let s = doc(serde_json::json!({"tags": "oa"}));
        assert!(!matches(&s, &cond("tags", Op::ArrayContains, "oa")));
    }

    #[test]
    fn test_dotted_paths() {
        let d = doc(serde_json::json!({"meta": {"journal": {"issn": "1465-5411"}}}));
        assert!(matches(&d, &cond("meta.journal.issn", Op::Eq, "1465-5411")));
        assert!(!matches(&d, &cond("meta.journal.eissn", Op::Eq, "x")));
    }

    #[test]
    fn test_bool_values() {
        let d = doc(serde_json::json!({"is_oa": true}));
        assert!(matches(&d, &cond("is_oa", Op::Eq, "yes")));
        assert!(matches(&d, &cond("is_oa", Op::Ne, "off")));
    }
}
