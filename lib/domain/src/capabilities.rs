//! The narrow capabilities the query runtime consumes. Every trait here
//! is an external collaborator — the runtime is generic over them and
//! ships no "real" backing implementation; `bin/core` wires up concrete
//! defaults.

use std::time::Duration;

use async_trait::async_trait;

use crate::http::{HttpRequest, HttpResponse};
use crate::mapping::Mapping;
use crate::query::Query;
use crate::result::Resources;

/// Resolves a resource name to its scheme/host/path-param shape. Pure
/// from the caller's perspective; an implementation may cache.
#[async_trait]
pub trait MappingRegistry: Send + Sync {
  async fn resolve(
    &self,
    tenant: &str,
    resource_name: &str,
  ) -> anyhow::Result<Option<Mapping>>;
}

/// Executes one HTTP call with a deadline. Must honor cancellation of
/// `deadline`, must not mutate `request`, must not retain references
/// past return.
#[async_trait]
pub trait HttpTransport: Send + Sync {
  async fn execute(
    &self,
    request: &HttpRequest,
    deadline: Duration,
  ) -> Result<HttpResponse, TransportError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
  #[error("request timed out")]
  Timeout,
  #[error("transport error: {0}")]
  Other(#[from] anyhow::Error),
}

/// Lifecycle hooks fired around a query and around each request inside
/// it. Fire-and-forget: errors and panics inside are swallowed by the
/// implementation, never surfaced to the runtime.
#[async_trait]
pub trait PluginHost: Send + Sync {
  async fn before_query(&self, query: &Query);
  async fn after_query(&self, query: &Query, result: &Resources);
  async fn before_request(&self, request: &HttpRequest);
  async fn after_request(
    &self,
    request: &HttpRequest,
    response: Option<&HttpResponse>,
    error: Option<&str>,
  );
}

/// The environment source the mapping registry merges into its
/// defaults/local-config layers.
pub trait EnvSource: Send + Sync {
  fn get_string(&self, key: &str) -> Option<String>;
  fn get_all(&self) -> Vec<(String, String)>;
}
