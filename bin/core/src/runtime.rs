//! Runtime Facade (C9): the single entry point the HTTP frontend calls.
//! Computes the deadline, fires the query-level plugin hooks around the
//! scheduler, and applies the filter pipeline to what comes back.

use std::sync::Arc;
use std::time::{Duration, Instant};

use domain::{
  HttpTransport, MappingRegistry, PluginHost, Query, QueryContext,
  Resources, RestqlError,
};

use crate::{filter, scheduler};

pub struct Runtime {
  pub mapping_registry: Arc<dyn MappingRegistry>,
  pub http_transport: Arc<dyn HttpTransport>,
  pub plugin_host: Arc<dyn PluginHost>,
  pub global_query_timeout: Duration,
  pub query_resource_timeout: Duration,
}

impl Runtime {
  pub async fn run(
    &self,
    query: Query,
    ctx: QueryContext,
  ) -> Result<Resources, RestqlError> {
    self.plugin_host.before_query(&query).await;

    let global_deadline = query
      .use_opts
      .timeout
      .unwrap_or(self.global_query_timeout);
    let global_deadline_at = Instant::now() + global_deadline;

    let resources = scheduler::run(
      &query,
      &ctx,
      self.mapping_registry.as_ref(),
      self.http_transport.as_ref(),
      self.plugin_host.as_ref(),
      global_deadline_at,
      self.query_resource_timeout,
    )
    .await?;

    if resources.is_empty() && !query.statements.is_empty() {
      return Err(RestqlError::Deadline);
    }

    let filtered = filter::apply(&query, resources);
    self.plugin_host.after_query(&query, &filtered).await;
    Ok(filtered)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use async_trait::async_trait;
  use domain::{
    DoneResource, Details, HttpRequest, HttpResponse, Mapping,
    ResourceEntry, Statement, TransportError, Value,
  };

  struct StubMappingRegistry;
  #[async_trait]
  impl MappingRegistry for StubMappingRegistry {
    async fn resolve(
      &self,
      _tenant: &str,
      resource_name: &str,
    ) -> anyhow::Result<Option<Mapping>> {
      Ok(Some(Mapping::parse(resource_name, "http://hero.api/id").unwrap()))
    }
  }

  struct StubTransport;
  #[async_trait]
  impl HttpTransport for StubTransport {
    async fn execute(
      &self,
      _request: &HttpRequest,
      _deadline: Duration,
    ) -> Result<HttpResponse, TransportError> {
      Ok(HttpResponse {
        status: 200,
        headers: Default::default(),
        body: Value::String("ok".into()),
        parse_failed: false,
      })
    }
  }

  struct NoopPluginHost;
  #[async_trait]
  impl PluginHost for NoopPluginHost {
    async fn before_query(&self, _query: &Query) {}
    async fn after_query(&self, _query: &Query, _result: &Resources) {}
    async fn before_request(&self, _request: &HttpRequest) {}
    async fn after_request(
      &self,
      _request: &HttpRequest,
      _response: Option<&HttpResponse>,
      _error: Option<&str>,
    ) {
    }
  }

  fn runtime() -> Runtime {
    Runtime {
      mapping_registry: Arc::new(StubMappingRegistry),
      http_transport: Arc::new(StubTransport),
      plugin_host: Arc::new(NoopPluginHost),
      global_query_timeout: Duration::from_secs(1),
      query_resource_timeout: Duration::from_millis(500),
    }
  }

  #[tokio::test]
  async fn runs_a_single_statement_query() {
    let query = Query {
      statements: vec![Statement {
        resource: "hero".into(),
        ..Default::default()
      }],
      ..Default::default()
    };
    let resources =
      runtime().run(query, QueryContext::default()).await.unwrap();
    match &resources["hero"] {
      ResourceEntry::Single(DoneResource { details, result }) => {
        assert!(details.success);
        assert_eq!(result, &Value::String("ok".into()));
      }
      ResourceEntry::Multiplexed(_) => panic!("expected single"),
    }
  }

  #[tokio::test]
  async fn empty_query_returns_empty_resources() {
    let resources = runtime()
      .run(Query::default(), QueryContext::default())
      .await
      .unwrap();
    assert!(resources.is_empty());
  }

  #[test]
  fn details_new_is_exercised_by_the_stub() {
    let details = Details::new(200, false);
    assert!(details.success);
  }
}
