use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Debugging {
  pub method: String,
  pub url: String,
  pub request_headers: HashMap<String, String>,
  pub response_headers: HashMap<String, String>,
  pub params: HashMap<String, String>,
  pub request_body: Value,
  pub response_time_ms: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Details {
  pub status: u16,
  pub success: bool,
  pub ignore_errors: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub debug: Option<Debugging>,
}

impl Details {
  /// `200 <= status < 400 <=> success`, enforced at construction so the
  /// invariant can never drift from the status that produced it.
  pub fn new(status: u16, ignore_errors: bool) -> Details {
    Details {
      status,
      success: (200..400).contains(&status),
      ignore_errors,
      debug: None,
    }
  }

  pub fn with_debug(mut self, debug: Debugging) -> Details {
    self.debug = Some(debug);
    self
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoneResource {
  pub details: Details,
  pub result: Value,
}

pub type DoneResources = Vec<DoneResource>;

/// The value stored under one alias: either a single statement's result
/// or, when multiplexed, an ordered list of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceEntry {
  Single(DoneResource),
  Multiplexed(DoneResources),
}

impl ResourceEntry {
  pub fn is_success(&self) -> bool {
    match self {
      ResourceEntry::Single(r) => r.details.success,
      ResourceEntry::Multiplexed(rs) => {
        rs.iter().all(|r| r.details.success)
      }
    }
  }
}

pub type Resources = HashMap<String, ResourceEntry>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn details_success_follows_status_range() {
    assert!(Details::new(200, false).success);
    assert!(Details::new(399, false).success);
    assert!(!Details::new(400, false).success);
    assert!(!Details::new(0, false).success);
    assert!(!Details::new(408, false).success);
  }
}
