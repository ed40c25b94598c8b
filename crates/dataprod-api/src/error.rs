//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler. Every variant renders as
/// `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  /// The request could not be extracted (bad JSON, path or query).
  #[error("{message}")]
  Rejected { status: StatusCode, message: String },

  #[error("service error: {0}")]
  Service(#[source] dataprod_core::Error),
}

impl From<dataprod_core::Error> for ApiError {
  fn from(e: dataprod_core::Error) -> Self {
    match e {
      dataprod_core::Error::NotFound(m) => ApiError::NotFound(m),
      dataprod_core::Error::BadRequest(m) => ApiError::BadRequest(m),
      dataprod_core::Error::Conflict(m) => ApiError::Conflict(m),
      other => ApiError::Service(other),
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(r: JsonRejection) -> Self {
    ApiError::Rejected { status: r.status(), message: r.body_text() }
  }
}

impl From<PathRejection> for ApiError {
  fn from(r: PathRejection) -> Self {
    ApiError::Rejected { status: r.status(), message: r.body_text() }
  }
}

impl From<QueryRejection> for ApiError {
  fn from(r: QueryRejection) -> Self {
    ApiError::Rejected { status: r.status(), message: r.body_text() }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Rejected { status, message } => (*status, message.clone()),
      ApiError::Service(e) => {
        tracing::error!(error = %e, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
