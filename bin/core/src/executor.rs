//! Statement Executor (C5): turns one statement's resolved fields into
//! an `HttpRequest`, fires the plugin hooks around the transport call,
//! and wraps the outcome as a `DoneResource`. Never returns an `Err` —
//! every failure mode folds into `Details`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use domain::{
  Debugging, Details, DoneResource, HttpRequest, HttpTransport, Mapping,
  PluginHost, QueryValue, Statement, TransportError, Value,
};

pub struct ExecutionInputs<'a> {
  pub statement: &'a Statement,
  pub mapping: &'a Mapping,
  pub path_params: HashMap<String, String>,
  pub fields: HashMap<String, Value>,
  pub headers: HashMap<String, String>,
  pub debug: bool,
}

pub async fn execute(
  inputs: ExecutionInputs<'_>,
  transport: &dyn HttpTransport,
  plugin_host: &dyn PluginHost,
  deadline: Duration,
) -> DoneResource {
  let request = build_request(
    inputs.statement,
    inputs.mapping,
    &inputs.path_params,
    inputs.fields,
    inputs.headers,
  );

  plugin_host.before_request(&request).await;
  let started = Instant::now();
  let outcome = transport.execute(&request, deadline).await;
  let elapsed = started.elapsed();

  let (details, result) = match &outcome {
    Ok(response) => {
      plugin_host
        .after_request(&request, Some(response), None)
        .await;
      // A JSON `Content-Type` whose body didn't parse is an upstream
      // failure regardless of the status it arrived with: never let
      // it read as success.
      let status = if response.parse_failed { 500 } else { response.status };
      let details = Details::new(status, inputs.statement.ignore_errors);
      (details, response.body.clone())
    }
    Err(TransportError::Timeout) => {
      plugin_host.after_request(&request, None, Some("timeout")).await;
      (Details::new(408, inputs.statement.ignore_errors), Value::Null)
    }
    Err(TransportError::Other(e)) => {
      let message = e.to_string();
      plugin_host
        .after_request(&request, None, Some(&message))
        .await;
      (Details::new(0, inputs.statement.ignore_errors), Value::Null)
    }
  };

  let details = if inputs.debug {
    details.with_debug(Debugging {
      method: request.method.as_str().to_string(),
      url: format!(
        "{}://{}{}",
        request.scheme, request.host, request.path
      ),
      request_headers: request.headers.clone(),
      response_headers: outcome
        .as_ref()
        .map(|r| r.headers.clone())
        .unwrap_or_default(),
      params: inputs.path_params.clone(),
      request_body: request.body.clone(),
      response_time_ms: elapsed.as_millis(),
    })
  } else {
    details
  };

  DoneResource { details, result }
}

fn build_request(
  statement: &Statement,
  mapping: &Mapping,
  path_params: &HashMap<String, String>,
  fields: HashMap<String, Value>,
  headers: HashMap<String, String>,
) -> HttpRequest {
  let substituted = substitute_path_params(&mapping.host, path_params);
  let (host, path) = split_host_path(&substituted);

  let (query, body) = if statement.method.carries_body() {
    let body =
      Value::Object(fields.into_iter().collect());
    (HashMap::new(), body)
  } else {
    let query = fields
      .into_iter()
      .map(|(key, value)| (key, to_query_value(value)))
      .collect();
    (query, Value::Null)
  };

  HttpRequest {
    scheme: mapping.scheme.clone(),
    host,
    path,
    method: statement.method,
    query,
    headers,
    body,
  }
}

fn substitute_path_params(
  template: &str,
  path_params: &HashMap<String, String>,
) -> String {
  let mut rendered = template.to_string();
  for (name, value) in path_params {
    rendered = rendered.replace(&format!("{{{name}}}"), value);
  }
  rendered
}

fn split_host_path(authority_and_path: &str) -> (String, String) {
  match authority_and_path.split_once('/') {
    Some((host, rest)) => (host.to_string(), format!("/{rest}")),
    None => (authority_and_path.to_string(), String::new()),
  }
}

fn to_query_value(value: Value) -> QueryValue {
  match value {
    Value::Array(items) => QueryValue::List(
      items
        .into_iter()
        .map(|v| domain::value::leaf_as_str(&v).unwrap_or_default())
        .collect(),
    ),
    other => QueryValue::Single(
      domain::value::leaf_as_str(&other).unwrap_or_default(),
    ),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn substitutes_single_path_param() {
    let mut params = HashMap::new();
    params.insert("id".to_string(), "42".to_string());
    let rendered =
      substitute_path_params("hero.api/{id}/weapons", &params);
    assert_eq!(rendered, "hero.api/42/weapons");
  }

  #[test]
  fn splits_host_from_path() {
    let (host, path) = split_host_path("hero.api/42/weapons");
    assert_eq!(host, "hero.api");
    assert_eq!(path, "/42/weapons");
  }

  #[test]
  fn splits_bare_host_with_no_path() {
    let (host, path) = split_host_path("hero.api");
    assert_eq!(host, "hero.api");
    assert_eq!(path, "");
  }

  #[test]
  fn query_value_flattens_list() {
    let v = to_query_value(serde_json::json!(["a", "b"]));
    assert_eq!(
      v,
      QueryValue::List(vec!["a".to_string(), "b".to_string()])
    );
  }
}
