use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Serialize;

/// API error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
  pub error: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub details: Option<String>,
}

impl ErrorResponse {
  pub fn new(error: impl Into<String>) -> Self {
    Self {
      error: error.into(),
      details: None,
    }
  }

  pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
    Self {
      error: error.into(),
      details: Some(details.into()),
    }
  }
}

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
  #[error("{0}")]
  ValidationError(String),

  #[error("missing or invalid api key")]
  Unauthorized,

  #[error("event dispatcher is not running")]
  DispatcherUnavailable,
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    match self {
      AppError::ValidationError(msg) => {
        tracing::warn!(validation_error = %msg, "Validation failed");
        let error_response = ErrorResponse::with_details("Invalid request", msg);
        (StatusCode::BAD_REQUEST, Json(error_response)).into_response()
      }
      AppError::Unauthorized => {
        tracing::warn!("Rejected request with missing or invalid api key");
        let error_response = ErrorResponse::new("Invalid or missing API key");
        (StatusCode::UNAUTHORIZED, Json(error_response)).into_response()
      }
      AppError::DispatcherUnavailable => {
        // Only happens while shutting down
        tracing::error!("Event dispatcher is gone");
        let error_response = ErrorResponse::new("Service is shutting down. Please try again later.");
        (StatusCode::SERVICE_UNAVAILABLE, Json(error_response)).into_response()
      }
    }
  }
}

impl From<crate::validation::ValidationError> for AppError {
  fn from(err: crate::validation::ValidationError) -> Self {
    AppError::ValidationError(err.to_string())
  }
}
