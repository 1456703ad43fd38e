use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::query::Method;
use crate::value::Value;

/// A single query-string binding: either one value or a list, which
/// renders as one repeated `key=value` pair per element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
  Single(String),
  List(Vec<String>),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpRequest {
  pub scheme: String,
  pub host: String,
  pub path: String,
  pub method: Method,
  #[serde(default)]
  pub query: HashMap<String, QueryValue>,
  #[serde(default)]
  pub headers: HashMap<String, String>,
  #[serde(default)]
  pub body: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpResponse {
  pub status: u16,
  #[serde(default)]
  pub headers: HashMap<String, String>,
  pub body: Value,
  /// Set when the body's `Content-Type` claimed JSON but the bytes
  /// didn't parse; the executor turns this into a `500` regardless of
  /// the status it arrived with.
  #[serde(default)]
  pub parse_failed: bool,
}

impl HttpResponse {
  pub fn content_type_is_json(&self) -> bool {
    self
      .headers
      .iter()
      .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
      .map(|(_, v)| v.contains("json"))
      .unwrap_or(false)
  }
}
