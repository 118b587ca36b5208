//! JSON REST API for Mindjoy.
//!
//! Exposes an axum [`Router`] backed by any [`RecordStore`]. Every
//! owner-scoped resource lives under `/owners/{owner_id}`. Mutations of tasks,
//! goals, and principles go through the access gate first and answer `402`
//! when it refuses. Auth, TLS, and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", mindjoy_api::api_router(app.clone()))
//! ```

pub mod entitlement;
pub mod error;
pub mod goals;
pub mod habits;
pub mod principles;
pub mod progress;
pub mod tasks;

use std::sync::Arc;

use axum::{
  Json, Router,
  routing::{get, patch, post, put},
};
use chrono::NaiveDate;
use mindjoy_core::{
  Mindjoy,
  clock::Clock,
  gate::Access,
  habit::DateRange,
  planner::{BatchWriteResult, PositionWrite},
  store::RecordStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use error::ApiError;

/// Build a fully-materialised API router for `app`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, C>(app: Arc<Mindjoy<S, C>>) -> Router<()>
where
  S: RecordStore + 'static,
  C: Clock + 'static,
{
  Router::new()
    // Entitlement
    .route(
      "/owners/{owner_id}/entitlement",
      get(entitlement::describe::<S, C>).post(entitlement::ensure::<S, C>),
    )
    .route("/owners/{owner_id}/entitlement/trial", post(entitlement::grant_trial::<S, C>))
    .route("/owners/{owner_id}/entitlement/active", post(entitlement::grant_active::<S, C>))
    .route("/owners/{owner_id}/access", get(entitlement::access::<S, C>))
    // Tasks
    .route(
      "/owners/{owner_id}/days/{date}/tasks",
      get(tasks::list::<S, C>).post(tasks::create::<S, C>),
    )
    .route("/owners/{owner_id}/days/{date}/tasks/order", put(tasks::reorder::<S, C>))
    .route(
      "/owners/{owner_id}/tasks/{id}",
      patch(tasks::edit::<S, C>).delete(tasks::remove::<S, C>),
    )
    .route("/owners/{owner_id}/tasks/{id}/promote", post(tasks::promote::<S, C>))
    .route("/owners/{owner_id}/tasks/{id}/toggle", post(tasks::toggle::<S, C>))
    // Goals
    .route(
      "/owners/{owner_id}/goals",
      get(goals::list::<S, C>).post(goals::create::<S, C>),
    )
    .route("/owners/{owner_id}/goals/order", put(goals::reorder::<S, C>))
    .route(
      "/owners/{owner_id}/goals/{id}",
      patch(goals::edit::<S, C>).delete(goals::remove::<S, C>),
    )
    .route("/owners/{owner_id}/goals/{id}/activate", post(goals::activate::<S, C>))
    .route("/owners/{owner_id}/goals/{id}/deactivate", post(goals::deactivate::<S, C>))
    .route("/owners/{owner_id}/goals/{id}/achieve", post(goals::achieve::<S, C>))
    .route("/owners/{owner_id}/goals/{id}/actions", get(goals::action_count::<S, C>))
    // Principles
    .route(
      "/owners/{owner_id}/principles",
      get(principles::list::<S, C>).post(principles::create::<S, C>),
    )
    .route("/owners/{owner_id}/principles/order", put(principles::reorder::<S, C>))
    .route(
      "/owners/{owner_id}/principles/{id}",
      patch(principles::edit::<S, C>).delete(principles::remove::<S, C>),
    )
    .route("/owners/{owner_id}/principles/{id}/promote", post(principles::promote::<S, C>))
    // Habits
    .route("/habits/system", get(habits::system::<S, C>))
    .route(
      "/owners/{owner_id}/habits/custom",
      get(habits::list_custom::<S, C>).post(habits::create_custom::<S, C>),
    )
    .route(
      "/owners/{owner_id}/habits/custom/{id}",
      patch(habits::rename_custom::<S, C>)
        .delete(habits::delete_custom::<S, C>),
    )
    .route(
      "/owners/{owner_id}/habits/selected",
      get(habits::selected::<S, C>).put(habits::select::<S, C>),
    )
    .route("/owners/{owner_id}/habits/toggle", post(habits::toggle::<S, C>))
    .route("/owners/{owner_id}/habits/day/{date}", get(habits::day::<S, C>))
    .route("/owners/{owner_id}/habits/week/{start}", get(habits::week::<S, C>))
    .route("/owners/{owner_id}/habits/rate", get(habits::rate::<S, C>))
    // Progress
    .route("/owners/{owner_id}/progress", get(progress::tasks::<S, C>))
    .with_state(app)
}

// ─── Shared helpers ──────────────────────────────────────────────────────────

/// Fail with `402` unless the owner may write right now.
pub(crate) async fn require_write<S, C>(
  app: &Mindjoy<S, C>,
  owner_id: Uuid,
) -> Result<(), ApiError>
where
  S: RecordStore,
  C: Clock,
{
  match app.gate().check(owner_id, app.now()).await? {
    Access::Granted(_) => Ok(()),
    Access::Denied(status) => Err(ApiError::PaymentRequired(status)),
  }
}

/// Body of a successful position-changing call.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchSummary {
  pub applied: Vec<PositionWrite>,
}

/// Turn a batch outcome into a response; an interrupted batch is a `503`.
pub(crate) fn batch_response(result: BatchWriteResult) -> Result<Json<BatchSummary>, ApiError> {
  match result.failed {
    None => Ok(Json(BatchSummary { applied: result.applied })),
    Some(failed) => Err(ApiError::PartialBatch {
      applied: result.applied,
      failed:  failed.write,
      pending: result.pending,
      message: failed.error.to_string(),
    }),
  }
}

/// JSON body accepted by every `.../order` endpoint.
#[derive(Debug, Deserialize)]
pub struct OrderBody {
  pub ids: Vec<Uuid>,
}

/// `?start=YYYY-MM-DD&end=YYYY-MM-DD`; both or neither.
#[derive(Debug, Default, Deserialize)]
pub struct RangeParams {
  pub start: Option<NaiveDate>,
  pub end:   Option<NaiveDate>,
}

impl RangeParams {
  pub fn into_range(self) -> Result<DateRange, ApiError> {
    match (self.start, self.end) {
      (None, None) => Ok(DateRange::AllTime),
      (Some(start), Some(end)) => Ok(DateRange::Between { start, end }),
      _ => Err(ApiError::BadRequest("start and end must be given together".into())),
    }
  }
}
