//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use kunden_core::{DomainError, ErrorKind, validate::Violations};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  /// Rendered as 422 with the field-level violations.
  #[error("validation failed: {0}")]
  Invalid(Violations),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a backend error, falling back to 500 for anything that is not
  /// a domain error.
  pub fn from_store<E>(err: E) -> Self
  where
    E: std::error::Error + DomainError + Send + Sync + 'static,
  {
    match err.into_domain() {
      Ok(domain) => domain.into(),
      Err(other) => Self::Store(Box::new(other)),
    }
  }
}

impl From<kunden_core::Error> for ApiError {
  fn from(err: kunden_core::Error) -> Self {
    match (err.kind(), err) {
      (_, kunden_core::Error::Invalid(v)) => Self::Invalid(v),
      (_, kunden_core::Error::UnknownAgent(id)) => {
        let mut v = Violations::default();
        v.push("vermittler", format!("Agent {id} does not exist."));
        Self::Invalid(v)
      }
      (_, kunden_core::Error::AgentDeleted(id)) => {
        let mut v = Violations::default();
        v.push("vermittler", format!("Agent {id} is deleted and cannot take customers."));
        Self::Invalid(v)
      }
      (ErrorKind::NotFound, e) => Self::NotFound(e.to_string()),
      (ErrorKind::Conflict, e) => Self::Conflict(e.to_string()),
      (_, e) => Self::Store(Box::new(e)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "error": m })),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, json!({ "error": m })),
      ApiError::Invalid(v) => (
        StatusCode::UNPROCESSABLE_ENTITY,
        json!({ "error": v.to_string(), "violations": v }),
      ),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() }))
      }
    };
    (status, Json(body)).into_response()
  }
}
