//! `GET /owners/:owner_id/progress[?start=..&end=..]`: task completion
//! summary over all time or an inclusive date range.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use mindjoy_core::{Mindjoy, clock::Clock, progress::TaskProgress, store::RecordStore};
use uuid::Uuid;

use crate::{RangeParams, error::ApiError};

pub async fn tasks<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path(owner_id): Path<Uuid>,
  Query(params): Query<RangeParams>,
) -> Result<Json<TaskProgress>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  let range = params.into_range()?;
  Ok(Json(app.progress().task_progress(owner_id, range).await?))
}
