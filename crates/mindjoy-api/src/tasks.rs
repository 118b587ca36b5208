//! Handlers for daily task endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/owners/:owner_id/days/:date/tasks` | Primary first |
//! | `POST`   | `/owners/:owner_id/days/:date/tasks` | Body: [`NewTask`]; 201 |
//! | `PUT`    | `/owners/:owner_id/days/:date/tasks/order` | Body: `{"ids":[...]}` |
//! | `PATCH`  | `/owners/:owner_id/tasks/:id` | Body: [`ItemEdit`] |
//! | `DELETE` | `/owners/:owner_id/tasks/:id` | Removing the primary clears the day |
//! | `POST`   | `/owners/:owner_id/tasks/:id/promote` | |
//! | `POST`   | `/owners/:owner_id/tasks/:id/toggle` | Flip completion |
//!
//! Everything except `GET` passes the access gate first.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use mindjoy_core::{
  Mindjoy,
  clock::Clock,
  item::{Item, ItemEdit},
  store::RecordStore,
  tasks::NewTask,
};
use uuid::Uuid;

use crate::{BatchSummary, OrderBody, batch_response, error::ApiError, require_write};

/// `GET /owners/:owner_id/days/:date/tasks`
pub async fn list<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path((owner_id, date)): Path<(Uuid, NaiveDate)>,
) -> Result<Json<Vec<Item>>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  Ok(Json(app.tasks().list(owner_id, date).await?))
}

/// `POST /owners/:owner_id/days/:date/tasks`
pub async fn create<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path((owner_id, date)): Path<(Uuid, NaiveDate)>,
  Json(body): Json<NewTask>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  require_write(&app, owner_id).await?;
  let task = app.tasks().create(owner_id, date, body, app.now()).await?;
  Ok((StatusCode::CREATED, Json(task)))
}

/// `PUT /owners/:owner_id/days/:date/tasks/order`
pub async fn reorder<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path((owner_id, date)): Path<(Uuid, NaiveDate)>,
  Json(body): Json<OrderBody>,
) -> Result<Json<BatchSummary>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  require_write(&app, owner_id).await?;
  batch_response(app.tasks().reorder(owner_id, date, &body.ids).await?)
}

/// `PATCH /owners/:owner_id/tasks/:id`
pub async fn edit<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path((owner_id, id)): Path<(Uuid, Uuid)>,
  Json(body): Json<ItemEdit>,
) -> Result<Json<Item>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  require_write(&app, owner_id).await?;
  Ok(Json(app.tasks().edit(owner_id, id, &body).await?))
}

/// `DELETE /owners/:owner_id/tasks/:id`
pub async fn remove<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path((owner_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<BatchSummary>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  require_write(&app, owner_id).await?;
  batch_response(app.tasks().remove(owner_id, id).await?)
}

/// `POST /owners/:owner_id/tasks/:id/promote`
pub async fn promote<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path((owner_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<BatchSummary>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  require_write(&app, owner_id).await?;
  batch_response(app.tasks().promote(owner_id, id).await?)
}

/// `POST /owners/:owner_id/tasks/:id/toggle`
pub async fn toggle<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path((owner_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Item>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  require_write(&app, owner_id).await?;
  Ok(Json(app.tasks().toggle_complete(owner_id, id, app.now()).await?))
}
