//! The runtime-typed JSON value that flows through the query pipeline.
//!
//! `serde_json::Value` already is the tagged sum the design calls for
//! (object | array | string | number | bool | null) with no loss of
//! numeric precision, so path-walks elsewhere in this crate match on it
//! exhaustively instead of downcasting an opaque `Any`.

pub use serde_json::Value;
pub use serde_json::Number;

/// Walk `path` through `value`, descending into objects by key and arrays
/// by parsed integer index. Used by the value resolver to follow a chain
/// reference and by the filter pipeline is deliberately *not* built on
/// this — it needs selector-aware traversal, see `restql_core::filter`.
pub fn walk_path<'a>(
  value: &'a Value,
  path: &[String],
) -> Option<&'a Value> {
  let mut current = value;
  for segment in path {
    current = match current {
      Value::Object(map) => map.get(segment)?,
      Value::Array(list) => {
        let index: usize = segment.parse().ok()?;
        list.get(index)?
      }
      _ => return None,
    };
  }
  Some(current)
}

/// Render a primitive leaf the way a match-selector regex is applied to
/// it: strings are used as-is, everything else uses its JSON text form
/// without surrounding quotes.
pub fn leaf_as_str(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    Value::Null => None,
    Value::Object(_) | Value::Array(_) => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn walks_object_then_array_then_object() {
    let v = json!({"a": [{"b": "hi"}]});
    let path = vec!["a".to_string(), "0".to_string(), "b".to_string()];
    assert_eq!(walk_path(&v, &path), Some(&json!("hi")));
  }

  #[test]
  fn missing_segment_is_none() {
    let v = json!({"a": 1});
    let path = vec!["nope".to_string()];
    assert_eq!(walk_path(&v, &path), None);
  }

  #[test]
  fn leaf_as_str_renders_primitives() {
    assert_eq!(leaf_as_str(&json!("batman")), Some("batman".to_string()));
    assert_eq!(leaf_as_str(&json!(42)), Some("42".to_string()));
    assert_eq!(leaf_as_str(&json!(true)), Some("true".to_string()));
    assert_eq!(leaf_as_str(&json!(null)), None);
  }
}
