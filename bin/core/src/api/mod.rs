use axum::{
  Json, Router,
  extract::State,
  http::{HeaderName, HeaderValue, StatusCode},
  response::{IntoResponse, Response},
  routing::{get, post},
};
use domain::{Query, QueryContext, Resources, RestqlError};
use serde::{Deserialize, Serialize};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::{config::cors_layer, runtime::Runtime};

/// The binary-side mapping from the library's error taxonomy to HTTP
/// status: `compile` is a client mistake, `deadline` means the server
/// couldn't produce anything in time, everything else never reaches
/// here — per-statement failures stay embedded in the 200.
struct ApiError(RestqlError);

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self.0 {
      RestqlError::Compile(_) => StatusCode::BAD_REQUEST,
      RestqlError::Deadline => StatusCode::GATEWAY_TIMEOUT,
      RestqlError::MappingRegistry(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
  }
}

#[derive(Serialize)]
struct ErrorBody {
  error: String,
}

#[derive(Deserialize)]
struct QueryRequest {
  query: Query,
  #[serde(default)]
  context: QueryContext,
}

async fn run_query(
  State(runtime): State<std::sync::Arc<Runtime>>,
  Json(body): Json<QueryRequest>,
) -> Result<Json<Resources>, ApiError> {
  let resources =
    runtime.run(body.query, body.context).await.map_err(ApiError)?;
  Ok(Json(resources))
}

pub fn app(runtime: std::sync::Arc<Runtime>) -> Router {
  Router::new()
    .route("/query", post(run_query))
    .with_state(runtime)
    .layer(cors_layer())
    .layer(SetResponseHeaderLayer::overriding(
      HeaderName::from_static("x-content-type-options"),
      HeaderValue::from_static("nosniff"),
    ))
}

pub fn health_router() -> Router {
  Router::new().route("/health", get(|| async { StatusCode::OK }))
}
