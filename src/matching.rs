//! Shallow record comparison used to avoid creating duplicate resources.

use serde_json::{Map, Number, Value};

/// Compare two flat records key by key.
///
/// Records are equal when they have the same key set and every value is
/// equal. Scalars compare by value; numbers compare numerically, so `1`
/// equals `1.0`. Arrays and objects compare by identity: they only match
/// when both sides refer to the very same value, so two separately decoded
/// but identical nested objects are NOT equal.
pub fn shallow_equals(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
  if a.len() != b.len() {
    return false;
  }

  a.iter().all(|(key, left)| match b.get(key) {
    Some(right) => same_value(left, right),
    None => false,
  })
}

fn same_value(left: &Value, right: &Value) -> bool {
  match (left, right) {
    (Value::Array(_), _) | (Value::Object(_), _) | (_, Value::Array(_)) | (_, Value::Object(_)) => {
      std::ptr::eq(left, right)
    }
    (Value::Number(l), Value::Number(r)) => same_number(l, r),
    _ => left == right,
  }
}

fn same_number(l: &Number, r: &Number) -> bool {
  if let (Some(a), Some(b)) = (l.as_i64(), r.as_i64()) {
    return a == b;
  }
  if let (Some(a), Some(b)) = (l.as_u64(), r.as_u64()) {
    return a == b;
  }
  l.as_f64() == r.as_f64()
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn record(value: Value) -> Map<String, Value> {
    match value {
      Value::Object(map) => map,
      other => panic!("expected an object, got {}", other),
    }
  }

  #[test]
  fn test_empty_records_are_equal() {
    assert!(shallow_equals(&Map::new(), &Map::new()));
  }

  #[test]
  fn test_extra_key_is_not_equal() {
    let a = record(json!({"a": 1}));
    let b = record(json!({"a": 1, "b": 2}));
    assert!(!shallow_equals(&a, &b));
    assert!(!shallow_equals(&b, &a));
  }

  #[test]
  fn test_key_order_is_irrelevant() {
    let a = record(json!({"a": 1, "b": 2}));
    let b = record(json!({"b": 2, "a": 1}));
    assert!(shallow_equals(&a, &b));
  }

  #[test]
  fn test_different_keys_same_size() {
    let a = record(json!({"a": 1}));
    let b = record(json!({"b": 1}));
    assert!(!shallow_equals(&a, &b));
  }

  #[test]
  fn test_scalar_mismatch() {
    let a = record(json!({"mail": "dev@example.com"}));
    let b = record(json!({"mail": "ops@example.com"}));
    assert!(!shallow_equals(&a, &b));
  }

  #[test]
  fn test_scalar_types_are_strict() {
    let a = record(json!({"id": 1}));
    let b = record(json!({"id": "1"}));
    assert!(!shallow_equals(&a, &b));
  }

  #[test]
  fn test_integer_equals_equivalent_float() {
    let a: Map<String, Value> = serde_json::from_str(r#"{"port": 1}"#).unwrap();
    let b: Map<String, Value> = serde_json::from_str(r#"{"port": 1.0}"#).unwrap();
    assert!(shallow_equals(&a, &b));
    assert!(shallow_equals(&b, &a));
  }

  #[test]
  fn test_numbers_compare_by_value() {
    let a = record(json!({"port": 1, "big": u64::MAX, "neg": -3}));
    let b = record(json!({"port": 1.5, "big": u64::MAX, "neg": -3}));
    assert!(!shallow_equals(&a, &b));

    let c = record(json!({"port": 1, "big": u64::MAX, "neg": -3.0}));
    assert!(shallow_equals(&a, &c));
  }

  #[test]
  fn test_distinct_nested_objects_are_not_equal() {
    let a = record(json!({"a": {"x": 1}}));
    let b = record(json!({"a": {"x": 1}}));
    assert!(!shallow_equals(&a, &b));
  }

  #[test]
  fn test_same_nested_instance_is_equal() {
    let a = record(json!({"a": {"x": 1}, "tags": ["one"]}));
    assert!(shallow_equals(&a, &a));
  }
}
