use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::value::Value;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
  Get,
  Post,
  Put,
  Patch,
  Delete,
}

impl Method {
  pub fn as_str(&self) -> &'static str {
    match self {
      Method::Get => "GET",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Patch => "PATCH",
      Method::Delete => "DELETE",
    }
  }

  /// POST/PUT/PATCH resolve their `with` into a JSON body; GET/DELETE
  /// flatten it into the query string.
  pub fn carries_body(&self) -> bool {
    matches!(self, Method::Post | Method::Put | Method::Patch)
  }
}

/// A single element of a chain path or a literal path segment. `Star`
/// is the distinguished "admit every sibling" segment used by `only`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segment {
  Star(StarMarker),
  Name(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarMarker;

impl Segment {
  pub fn star() -> Self {
    Segment::Star(StarMarker)
  }

  pub fn is_star(&self) -> bool {
    matches!(self, Segment::Star(_))
  }

  pub fn name(&self) -> Option<&str> {
    match self {
      Segment::Name(n) => Some(n.as_str()),
      Segment::Star(_) => None,
    }
  }
}

impl From<&str> for Segment {
  fn from(value: &str) -> Self {
    if value == "*" {
      Segment::star()
    } else {
      Segment::Name(value.to_string())
    }
  }
}

/// One element of a statement's `only` list: either a plain path, or a
/// path whose leaf must match a regex.
#[derive(Debug, Clone)]
pub enum Selector {
  Path(Vec<Segment>),
  Match(Vec<Segment>, regex::Regex),
}

impl Selector {
  pub fn path(&self) -> &[Segment] {
    match self {
      Selector::Path(p) => p,
      Selector::Match(p, _) => p,
    }
  }
}

// `regex::Regex` has no `PartialEq`/`Eq`, so selectors compare by source
// pattern only, which is enough for the tests and for dedup purposes.
impl PartialEq for Selector {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Selector::Path(a), Selector::Path(b)) => a == b,
      (Selector::Match(a, ra), Selector::Match(b, rb)) => {
        a == b && ra.as_str() == rb.as_str()
      }
      _ => false,
    }
  }
}

/// A reference to a value a statement's `with` field resolves to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueRef {
  /// A literal JSON-compatible value, sent through unchanged.
  Literal(Value),
  /// A query-wide parameter, looked up by name in `QueryContext.params`.
  Param(ParamRef),
  /// `[alias, field1, field2, ...]`, resolved against an earlier
  /// statement's result.
  Chain(ChainRef),
  /// A list of refs; if each resolves to a scalar this is a literal
  /// list, but if the list itself is what a chain/param resolves to
  /// and the statement binds it to a scalar field, it drives
  /// multiplexing (see `restql_core::multiplex`).
  List(Vec<ValueRef>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamRef {
  pub param: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainRef {
  pub alias: String,
  pub path: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Statement {
  #[serde(default)]
  pub method: Method,
  pub resource: String,
  #[serde(default)]
  pub alias: Option<String>,
  #[serde(default, rename = "in")]
  pub chain_target: Option<String>,
  #[serde(default)]
  pub with: HashMap<String, ValueRef>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub only: Vec<OnlySelector>,
  #[serde(default)]
  pub headers: HashMap<String, String>,
  #[serde(default, with = "duration_millis_opt")]
  pub timeout: Option<Duration>,
  #[serde(default)]
  pub hidden: bool,
  #[serde(default)]
  pub ignore_errors: bool,
  #[serde(default)]
  pub max_age: Option<u64>,
  #[serde(default)]
  pub s_max_age: Option<u64>,
}

impl Statement {
  /// The key this statement's result is filed under in `Resources`;
  /// defaults to the resource name.
  pub fn alias(&self) -> &str {
    self.alias.as_deref().unwrap_or(&self.resource)
  }
}

/// `Selector` isn't directly `Deserialize`-able (it holds a compiled
/// `Regex`), so statements carry the wire form and compile it lazily.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OnlySelector {
  Path(Vec<String>),
  Match { path: Vec<String>, regex: String },
}

impl OnlySelector {
  pub fn compile(&self) -> Result<Selector, regex::Error> {
    match self {
      OnlySelector::Path(segments) => Ok(Selector::Path(
        segments.iter().map(|s| Segment::from(s.as_str())).collect(),
      )),
      OnlySelector::Match { path, regex } => Ok(Selector::Match(
        path.iter().map(|s| Segment::from(s.as_str())).collect(),
        regex::Regex::new(regex)?,
      )),
    }
  }
}

// The wire schema allows omitting `method` for convenience; it defaults
// to GET, matching the original's un-annotated statements.
impl Default for Method {
  fn default() -> Self {
    Method::Get
  }
}

/// Opaque, query-wide options (`use` block). Timeouts are read by the
/// runtime facade; cache directives are passed through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UseOptions {
  #[serde(default, with = "duration_millis_opt")]
  pub timeout: Option<Duration>,
  #[serde(default)]
  pub max_age: Option<u64>,
  #[serde(default)]
  pub s_max_age: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Query {
  pub statements: Vec<Statement>,
  #[serde(default)]
  pub use_opts: UseOptions,
}

mod duration_millis_opt {
  use serde::{Deserialize, Deserializer, Serializer};
  use std::time::Duration;

  pub fn serialize<S>(
    value: &Option<Duration>,
    serializer: S,
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    match value {
      Some(d) => serializer.serialize_u64(d.as_millis() as u64),
      None => serializer.serialize_none(),
    }
  }

  pub fn deserialize<'de, D>(
    deserializer: D,
  ) -> Result<Option<Duration>, D::Error>
  where
    D: Deserializer<'de>,
  {
    let millis: Option<u64> = Option::deserialize(deserializer)?;
    Ok(millis.map(Duration::from_millis))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn statement_alias_defaults_to_resource() {
    let s = Statement {
      resource: "hero".into(),
      ..Default::default()
    };
    assert_eq!(s.alias(), "hero");
  }

  #[test]
  fn statement_alias_honors_override() {
    let s = Statement {
      resource: "hero".into(),
      alias: Some("h".into()),
      ..Default::default()
    };
    assert_eq!(s.alias(), "h");
  }

  #[test]
  fn method_carries_body() {
    assert!(Method::Post.carries_body());
    assert!(Method::Put.carries_body());
    assert!(Method::Patch.carries_body());
    assert!(!Method::Get.carries_body());
    assert!(!Method::Delete.carries_body());
  }

  #[test]
  fn only_selector_compiles_path() {
    let compiled =
      OnlySelector::Path(vec!["city".into(), "name".into()])
        .compile()
        .unwrap();
    assert_eq!(compiled.path().len(), 2);
  }
}
