//! Handlers for the habit catalogue and the daily habit ledger.
//!
//! Habit writes are not gated; the gate covers tasks, goals, and principles.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use mindjoy_core::{
  Mindjoy,
  clock::Clock,
  habit::{
    CompletionRate, CustomHabit, HabitCompletion, HabitRef, HabitType, SelectedHabit,
    SystemHabit,
  },
  ledger::{HabitDay, WeeklyHabitProgress},
  store::RecordStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{RangeParams, error::ApiError};

// ─── Catalogue ───────────────────────────────────────────────────────────────

/// `GET /habits/system`
pub async fn system<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
) -> Result<Json<Vec<SystemHabit>>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  Ok(Json(app.habits().system_habits().await?))
}

/// `GET /owners/:owner_id/habits/custom`, newest first.
pub async fn list_custom<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path(owner_id): Path<Uuid>,
) -> Result<Json<Vec<CustomHabit>>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  Ok(Json(app.habits().custom_habits(owner_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct TitleBody {
  pub title: String,
}

impl TitleBody {
  fn validated(self) -> Result<String, ApiError> {
    let title = self.title.trim();
    if title.is_empty() {
      return Err(ApiError::BadRequest("title must not be empty".into()));
    }
    Ok(title.to_owned())
  }
}

/// `POST /owners/:owner_id/habits/custom`, body: `{"title":"..."}`
pub async fn create_custom<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path(owner_id): Path<Uuid>,
  Json(body): Json<TitleBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  let title = body.validated()?;
  let habit = app.habits().create_custom_habit(owner_id, title, app.now()).await?;
  Ok((StatusCode::CREATED, Json(habit)))
}

/// `PATCH /owners/:owner_id/habits/custom/:id`, body: `{"title":"..."}`
pub async fn rename_custom<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path((owner_id, id)): Path<(Uuid, Uuid)>,
  Json(body): Json<TitleBody>,
) -> Result<StatusCode, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  let title = body.validated()?;
  app.habits().rename_custom_habit(owner_id, id, title).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /owners/:owner_id/habits/custom/:id`; also deselects it.
pub async fn delete_custom<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path((owner_id, id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  app.habits().delete_custom_habit(owner_id, id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Selection ───────────────────────────────────────────────────────────────

/// `GET /owners/:owner_id/habits/selected`
pub async fn selected<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path(owner_id): Path<Uuid>,
) -> Result<Json<Vec<SelectedHabit>>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  Ok(Json(app.habits().selected(owner_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct SelectBody {
  pub habits: Vec<HabitRef>,
}

/// `PUT /owners/:owner_id/habits/selected`; replaces the whole selection.
pub async fn select<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path(owner_id): Path<Uuid>,
  Json(body): Json<SelectBody>,
) -> Result<Json<Vec<SelectedHabit>>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  Ok(Json(app.habits().select_habits(owner_id, &body.habits, app.now()).await?))
}

// ─── Completions ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ToggleBody {
  pub habit: HabitRef,
  /// Defaults to today.
  pub date:  Option<NaiveDate>,
}

/// `POST /owners/:owner_id/habits/toggle`
pub async fn toggle<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path(owner_id): Path<Uuid>,
  Json(body): Json<ToggleBody>,
) -> Result<Json<HabitCompletion>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  let date = body.date.unwrap_or_else(|| app.today());
  Ok(Json(app.habits().toggle_completion(owner_id, body.habit, date, app.now()).await?))
}

/// `GET /owners/:owner_id/habits/day/:date`
pub async fn day<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path((owner_id, date)): Path<(Uuid, NaiveDate)>,
) -> Result<Json<Vec<HabitDay>>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  Ok(Json(app.habits().day_view(owner_id, date).await?))
}

/// `GET /owners/:owner_id/habits/week/:start`
pub async fn week<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path((owner_id, start)): Path<(Uuid, NaiveDate)>,
) -> Result<Json<Vec<WeeklyHabitProgress>>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  Ok(Json(app.habits().weekly_progress(owner_id, start, app.today()).await?))
}

#[derive(Debug, Deserialize)]
pub struct RateParams {
  pub habit_type: HabitType,
  pub habit_id:   Uuid,
  pub start:      Option<NaiveDate>,
  pub end:        Option<NaiveDate>,
}

/// `GET /owners/:owner_id/habits/rate?habit_type=..&habit_id=..[&start=..&end=..]`
pub async fn rate<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path(owner_id): Path<Uuid>,
  Query(params): Query<RateParams>,
) -> Result<Json<CompletionRate>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  let habit = HabitRef::new(params.habit_type, params.habit_id);
  let range = RangeParams { start: params.start, end: params.end }.into_range()?;
  Ok(Json(app.habits().completion_rate(owner_id, habit, range, app.today()).await?))
}
