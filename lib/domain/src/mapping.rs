use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Resolved location of a resource: scheme/host plus the named path
/// parameters its URI template expects. `path_params` keeps declaration
/// order (used when reporting a missing-param error); `path_params_set`
/// is the membership check the value resolver uses on every `with` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mapping {
  pub resource_name: String,
  pub scheme: String,
  pub host: String,
  pub path_params: Vec<String>,
  pub path_params_set: HashSet<String>,
}

impl Mapping {
  /// Parse a mapping target URL of the shape `scheme://host/path/{id}`,
  /// extracting `{placeholder}` segments as path params. Mirrors the
  /// original's env/local mapping strings (`"http://hero.api/"`,
  /// `"http://hero.api/{id}"`).
  pub fn parse(resource_name: &str, url: &str) -> Option<Mapping> {
    let (scheme, rest) = url.split_once("://")?;
    let path_params: Vec<String> = rest
      .split('/')
      .filter_map(|segment| {
        segment
          .strip_prefix('{')
          .and_then(|s| s.strip_suffix('}'))
          .map(|s| s.to_string())
      })
      .collect();
    let path_params_set = path_params.iter().cloned().collect();
    Some(Mapping {
      resource_name: resource_name.to_string(),
      scheme: scheme.to_string(),
      host: rest.to_string(),
      path_params,
      path_params_set,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_plain_host() {
    let m = Mapping::parse("hero", "http://hero.api/").unwrap();
    assert_eq!(m.scheme, "http");
    assert_eq!(m.host, "hero.api/");
    assert!(m.path_params.is_empty());
    assert!(m.path_params_set.is_empty());
  }

  #[test]
  fn parses_path_params() {
    let m =
      Mapping::parse("hero", "https://hero.api/{id}/weapons").unwrap();
    assert_eq!(m.scheme, "https");
    assert_eq!(m.path_params, vec!["id".to_string()]);
    assert!(m.path_params_set.contains("id"));
  }
}
