//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use tally_core::store::StoreError;
use thiserror::Error;

/// An error returned by an API handler. Every variant renders as
/// `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("Unauthorized")]
  Unauthorized,

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a backend error: a dangling category reference is the
  /// caller's fault, anything else is ours.
  pub fn store<E: StoreError>(e: E) -> Self {
    match e.unknown_category() {
      Some(id) => ApiError::BadRequest(format!("Unknown category: {id}")),
      None => ApiError::Store(Box::new(e)),
    }
  }
}

impl From<tally_core::Error> for ApiError {
  fn from(e: tally_core::Error) -> Self {
    match e {
      tally_core::Error::EmptyPatch => ApiError::BadRequest(e.to_string()),
      tally_core::Error::Validation(msg) => {
        ApiError::BadRequest(format!("Invalid request body: {msg}"))
      }
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    tracing::debug!(reason = %rejection.body_text(), "rejected request body");
    ApiError::BadRequest("Invalid request body".into())
  }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self {
    tracing::debug!(reason = %rejection.body_text(), "rejected path parameter");
    ApiError::BadRequest("Invalid path parameter ID".into())
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self {
    tracing::debug!(reason = %rejection.body_text(), "rejected query string");
    ApiError::BadRequest("Invalid query parameters".into())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_owned())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
