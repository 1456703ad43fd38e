//! Default `HttpTransport` implementation, translated from the
//! original's `fasthttp`-based client (`internal/plataform/httpclient`)
//! onto `reqwest`, the HTTP client this workspace already uses for its
//! own outbound calls (see `auth/github/mod.rs`).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use domain::{HttpRequest, HttpResponse, Method, QueryValue, TransportError};

pub struct ReqwestTransport {
  client: reqwest::Client,
}

impl ReqwestTransport {
  pub fn new() -> anyhow::Result<ReqwestTransport> {
    let client = reqwest::Client::builder()
      .build()
      .map_err(anyhow::Error::from)?;
    Ok(ReqwestTransport { client })
  }
}

impl Default for ReqwestTransport {
  fn default() -> Self {
    ReqwestTransport::new().expect("failed to build reqwest client")
  }
}

#[async_trait]
impl domain::HttpTransport for ReqwestTransport {
  async fn execute(
    &self,
    request: &HttpRequest,
    deadline: Duration,
  ) -> Result<HttpResponse, TransportError> {
    let url = build_url(request).map_err(TransportError::Other)?;

    let mut builder = self.client.request(reqwest_method(request.method), url);
    for (key, value) in &request.headers {
      builder = builder.header(key, value);
    }
    if request.method.carries_body() {
      builder = builder.json(&request.body);
    }

    let started = Instant::now();
    let result = tokio::time::timeout(deadline, builder.send()).await;

    let response = match result {
      Err(_elapsed) => return Err(TransportError::Timeout),
      Ok(Err(e)) => return Err(TransportError::Other(e.into())),
      Ok(Ok(response)) => response,
    };

    make_response(response).await.map(|mut r| {
      r.headers.insert(
        "x-restql-response-time-ms".to_string(),
        started.elapsed().as_millis().to_string(),
      );
      r
    })
  }
}

fn reqwest_method(method: Method) -> reqwest::Method {
  match method {
    Method::Get => reqwest::Method::GET,
    Method::Post => reqwest::Method::POST,
    Method::Put => reqwest::Method::PUT,
    Method::Patch => reqwest::Method::PATCH,
    Method::Delete => reqwest::Method::DELETE,
  }
}

fn build_url(request: &HttpRequest) -> anyhow::Result<url::Url> {
  let base =
    format!("{}://{}{}", request.scheme, request.host, request.path);
  let mut url = url::Url::parse(&base)?;
  {
    let mut pairs = url.query_pairs_mut();
    for (key, value) in &request.query {
      match value {
        QueryValue::Single(v) => {
          pairs.append_pair(key, v);
        }
        QueryValue::List(values) => {
          for v in values {
            pairs.append_pair(key, v);
          }
        }
      }
    }
  }
  Ok(url)
}

async fn make_response(
  response: reqwest::Response,
) -> Result<HttpResponse, TransportError> {
  let status = response.status().as_u16();
  let headers: HashMap<String, String> = response
    .headers()
    .iter()
    .filter_map(|(k, v)| {
      v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string()))
    })
    .collect();

  let mut built = HttpResponse {
    status,
    headers,
    body: serde_json::Value::Null,
    parse_failed: false,
  };
  let is_json = built.content_type_is_json();

  let bytes = response
    .bytes()
    .await
    .map_err(|e| TransportError::Other(e.into()))?;

  if is_json {
    match serde_json::from_slice(&bytes) {
      Ok(body) => built.body = body,
      Err(_) => {
        built.body =
          serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned());
        built.parse_failed = true;
      }
    }
  } else {
    built.body =
      serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned());
  }

  Ok(built)
}

#[cfg(test)]
mod tests {
  use super::*;
  use domain::QueryValue;

  #[test]
  fn build_url_emits_repeated_query_keys_in_order() {
    let mut request = HttpRequest {
      scheme: "http".into(),
      host: "hero.api".into(),
      path: "/weapons".into(),
      method: Method::Get,
      ..Default::default()
    };
    request.query.insert(
      "tag".to_string(),
      QueryValue::List(vec!["a".into(), "b".into()]),
    );
    let url = build_url(&request).unwrap();
    assert_eq!(url.query(), Some("tag=a&tag=b"));
  }
}
