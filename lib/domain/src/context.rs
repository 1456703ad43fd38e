use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Everything about the incoming request that the query itself doesn't
/// carry: external parameters, headers to forward, tenant scope, and
/// whether per-statement debug info should be captured.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryContext {
  #[serde(default)]
  pub params: HashMap<String, Value>,
  #[serde(default)]
  pub forward_headers: HashMap<String, String>,
  #[serde(default = "default_tenant")]
  pub tenant: String,
  #[serde(default)]
  pub debug: bool,
}

fn default_tenant() -> String {
  "default".to_string()
}

impl QueryContext {
  pub fn param(&self, name: &str) -> Option<&Value> {
    self.params.get(name)
  }
}
