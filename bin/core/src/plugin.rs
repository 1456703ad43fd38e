//! Default Plugin Host (C14): fires each lifecycle hook on its own
//! detached task so a slow or panicking plugin never blocks the
//! scheduler, mirroring `manager.safeExecute`'s recover-and-log
//! wrapper. Tokio tasks already isolate panics into a `JoinError`, so
//! there is no need for `catch_unwind` here.

use std::sync::Arc;

use async_trait::async_trait;
use domain::{
  HttpRequest, HttpResponse, PluginHost, Query, QueryContext, Resources,
};

/// A lifecycle observer. All hooks default to no-ops so a plugin only
/// needs to implement the ones it cares about.
pub trait Plugin: Send + Sync {
  fn name(&self) -> &str;
  fn before_query(&self, _query: &Query, _ctx: &QueryContext) {}
  fn after_query(&self, _query: &Query, _result: &Resources) {}
  fn before_request(&self, _request: &HttpRequest) {}
  fn after_request(
    &self,
    _request: &HttpRequest,
    _response: Option<&HttpResponse>,
    _error: Option<&str>,
  ) {
  }
}

pub struct TaskPoolPluginHost {
  plugins: Vec<Arc<dyn Plugin>>,
}

impl TaskPoolPluginHost {
  pub fn new() -> Self {
    TaskPoolPluginHost { plugins: Vec::new() }
  }

  pub fn with_plugins(plugins: Vec<Arc<dyn Plugin>>) -> Self {
    TaskPoolPluginHost { plugins }
  }
}

impl Default for TaskPoolPluginHost {
  fn default() -> Self {
    Self::new()
  }
}

fn spawn_hook<F>(plugin_name: String, hook: &'static str, fut: F)
where
  F: Future<Output = ()> + Send + 'static,
{
  tokio::spawn(async move {
    if let Err(e) = tokio::spawn(fut).await {
      tracing::error!(
        plugin = plugin_name,
        hook,
        error = %e,
        "plugin hook panicked"
      );
    }
  });
}

use std::future::Future;

#[async_trait]
impl PluginHost for TaskPoolPluginHost {
  async fn before_query(&self, query: &Query) {
    let query = query.clone();
    let ctx = QueryContext::default();
    for plugin in &self.plugins {
      let plugin = plugin.clone();
      let query = query.clone();
      let ctx = ctx.clone();
      spawn_hook(plugin.name().to_string(), "BeforeQuery", async move {
        plugin.before_query(&query, &ctx);
      });
    }
  }

  async fn after_query(&self, query: &Query, result: &Resources) {
    let query = query.clone();
    let result = result.clone();
    for plugin in &self.plugins {
      let plugin = plugin.clone();
      let query = query.clone();
      let result = result.clone();
      spawn_hook(plugin.name().to_string(), "AfterQuery", async move {
        plugin.after_query(&query, &result);
      });
    }
  }

  async fn before_request(&self, request: &HttpRequest) {
    let request = request.clone();
    for plugin in &self.plugins {
      let plugin = plugin.clone();
      let request = request.clone();
      spawn_hook(plugin.name().to_string(), "BeforeRequest", async move {
        plugin.before_request(&request);
      });
    }
  }

  async fn after_request(
    &self,
    request: &HttpRequest,
    response: Option<&HttpResponse>,
    error: Option<&str>,
  ) {
    let request = request.clone();
    let response = response.cloned();
    let error = error.map(str::to_string);
    for plugin in &self.plugins {
      let plugin = plugin.clone();
      let request = request.clone();
      let response = response.clone();
      let error = error.clone();
      spawn_hook(plugin.name().to_string(), "AfterRequest", async move {
        plugin.after_request(&request, response.as_ref(), error.as_deref());
      });
    }
  }
}
