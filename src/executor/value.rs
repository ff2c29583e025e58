//! Row and value helpers shared by every step
//!
//! Values are JSON scalars or small arrays. Non-finite numbers cannot be
//! represented and are written as `null`, which every finiteness check rejects.

use std::cmp::Ordering;

use serde_json::{Map, Number, Value};

/// A row: field id (or aggregation key) to value
pub type Row = Map<String, Value>;

static NULL: Value = Value::Null;

/// Converts an `f64` into a JSON value, mapping NaN and infinities to `null`
pub fn number(v: f64) -> Value {
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}

/// Returns the value as a finite `f64`, if it is a number
pub fn as_finite_f64(value: &Value) -> Option<f64> {
    value.as_f64().filter(|v| v.is_finite())
}

/// Returns the row's value for `key` as a finite `f64`
pub fn finite_field(row: &Row, key: &str) -> Option<f64> {
    row.get(key).and_then(as_finite_f64)
}

/// Value equality used for membership and grouping.
///
/// Numbers compare numerically (`1 == 1.0`); everything else compares as
/// JSON. `false`, `0` and `""` are distinct from one another.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(xf), Some(yf)) => xf == yf,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        _ => a == b,
    }
}

/// Canonical key for a combination of values.
///
/// Two keys are equal exactly when the values are equal under
/// [`values_equal`]; numbers are written through `f64` so `1` and `1.0`
/// share a key.
pub fn group_key<'a, I>(values: I) -> String
where
    I: IntoIterator<Item = Option<&'a Value>>,
{
    let parts: Vec<Value> = values
        .into_iter()
        .map(|v| canonical(v.unwrap_or(&NULL)))
        .collect();
    serde_json::to_string(&parts).unwrap_or_default()
}

fn canonical(value: &Value) -> Value {
    match value {
        Value::Number(n) => n
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| value.clone()),
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        other => other.clone(),
    }
}

/// String form used by pattern rules and category labels
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over optional values for sorting.
///
/// Ordering rules:
/// - missing < null < bool < number < string < array < object
/// - Same type compares naturally; arrays compare element-wise
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a_val), Some(b_val)) => {
            let a_type = type_rank(a_val);
            let b_type = type_rank(b_val);
            if a_type != b_type {
                return a_type.cmp(&b_type);
            }

            match (a_val, b_val) {
                (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
                (Value::Number(x), Value::Number(y)) => {
                    let xf = x.as_f64().unwrap_or(0.0);
                    let yf = y.as_f64().unwrap_or(0.0);
                    xf.partial_cmp(&yf).unwrap_or(Ordering::Equal)
                }
                (Value::String(x), Value::String(y)) => x.cmp(y),
                (Value::Array(xs), Value::Array(ys)) => {
                    for (x, y) in xs.iter().zip(ys) {
                        let ord = compare_values(Some(x), Some(y));
                        if ord != Ordering::Equal {
                            return ord;
                        }
                    }
                    xs.len().cmp(&ys.len())
                }
                _ => Ordering::Equal,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_finite_becomes_null() {
        assert_eq!(number(f64::NAN), Value::Null);
        assert_eq!(number(f64::INFINITY), Value::Null);
        assert_eq!(number(1.5), json!(1.5));
        assert_eq!(as_finite_f64(&Value::Null), None);
    }

    #[test]
    fn test_falsy_values_are_distinct() {
        assert!(!values_equal(&json!(false), &json!(0)));
        assert!(!values_equal(&json!(0), &json!("")));
        assert!(!values_equal(&json!(""), &json!(false)));
        assert!(!values_equal(&json!(""), &Value::Null));
        assert!(values_equal(&json!(0), &json!(0.0)));
        assert!(values_equal(&json!(false), &json!(false)));
    }

    #[test]
    fn test_group_key_distinguishes_types() {
        let a = json!("1");
        let b = json!(1);
        assert_ne!(group_key([Some(&a)]), group_key([Some(&b)]));
        assert_eq!(group_key([None]), group_key([Some(&Value::Null)]));
    }

    #[test]
    fn test_group_key_agrees_with_values_equal() {
        let int = json!(1);
        let float = json!(1.0);
        let bins = [json!([0, 2.5]), json!([0.0, 2.5])];
        assert!(values_equal(&int, &float));
        assert_eq!(group_key([Some(&int)]), group_key([Some(&float)]));
        assert!(values_equal(&bins[0], &bins[1]));
        assert_eq!(group_key([Some(&bins[0])]), group_key([Some(&bins[1])]));
    }

    #[test]
    fn test_compare_values_type_order() {
        assert_eq!(compare_values(None, Some(&Value::Null)), Ordering::Less);
        assert_eq!(
            compare_values(Some(&json!(true)), Some(&json!(0))),
            Ordering::Less
        );
        assert_eq!(
            compare_values(Some(&json!(10)), Some(&json!("a"))),
            Ordering::Less
        );
        assert_eq!(
            compare_values(Some(&json!([1.0, 2.0])), Some(&json!([1.0, 3.0]))),
            Ordering::Less
        );
    }
}
