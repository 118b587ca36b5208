//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use mindjoy_core::{entitlement::SubscriptionStatus, planner::PositionWrite};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The access gate refused a write.
  #[error("writes are not permitted while the subscription is {0}")]
  PaymentRequired(SubscriptionStatus),

  /// Capacity, primacy, goal-transition, and in-use violations.
  #[error("{0}")]
  Conflict(String),

  #[error("{0}")]
  Unprocessable(String),

  /// The store could not be reached; retrying may succeed.
  #[error("{0}")]
  Unavailable(String),

  /// A sequence of position writes stopped partway. The client should
  /// re-fetch and retry.
  #[error("position writes stopped partway: {message}")]
  PartialBatch {
    applied: Vec<PositionWrite>,
    failed:  PositionWrite,
    pending: Vec<PositionWrite>,
    message: String,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<mindjoy_core::Error> for ApiError {
  fn from(err: mindjoy_core::Error) -> Self {
    use mindjoy_core::Error as E;
    match err {
      E::NotFound(id) => ApiError::NotFound(format!("{id} not found")),
      E::InvalidReorderSet(_) => ApiError::Unprocessable(err.to_string()),
      E::CapacityExceeded { .. }
      | E::PrimaryMissing
      | E::InvalidTransition { .. }
      | E::PrincipleInUse(_) => ApiError::Conflict(err.to_string()),
      E::TransientStoreFailure(_) => ApiError::Unavailable(err.to_string()),
      other => ApiError::Store(Box::new(other)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let message = self.to_string();
    let (status, body) = match self {
      ApiError::NotFound(_) => (StatusCode::NOT_FOUND, json!({ "error": message })),
      ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
      ApiError::PaymentRequired(status) => (
        StatusCode::PAYMENT_REQUIRED,
        json!({ "error": message, "status": status }),
      ),
      ApiError::Conflict(_) => (StatusCode::CONFLICT, json!({ "error": message })),
      ApiError::Unprocessable(_) => {
        (StatusCode::UNPROCESSABLE_ENTITY, json!({ "error": message }))
      }
      ApiError::Unavailable(_) => {
        (StatusCode::SERVICE_UNAVAILABLE, json!({ "error": message }))
      }
      ApiError::PartialBatch { applied, failed, pending, .. } => {
        warn!(failed = %failed.item_id, pending = pending.len(), "returning partial batch");
        (
          StatusCode::SERVICE_UNAVAILABLE,
          json!({
            "error":   message,
            "applied": applied,
            "failed":  failed,
            "pending": pending,
          }),
        )
      }
      ApiError::Store(source) => {
        error!(error = %source, "store error");
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": message }))
      }
    };
    (status, Json(body)).into_response()
  }
}
