//! Handlers for goal endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/owners/:owner_id/goals` | `?active=true` for the ordered active view |
//! | `POST`   | `/owners/:owner_id/goals` | Body: [`NewGoal`]; 201 |
//! | `PUT`    | `/owners/:owner_id/goals/order` | Active goals only |
//! | `PATCH`  | `/owners/:owner_id/goals/:id` | Body: [`ItemEdit`] |
//! | `DELETE` | `/owners/:owner_id/goals/:id` | |
//! | `POST`   | `/owners/:owner_id/goals/:id/activate` | Appends at the tail |
//! | `POST`   | `/owners/:owner_id/goals/:id/deactivate` | |
//! | `POST`   | `/owners/:owner_id/goals/:id/achieve` | Terminal |
//! | `GET`    | `/owners/:owner_id/goals/:id/actions` | Linked task count |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use mindjoy_core::{
  Mindjoy,
  clock::Clock,
  goals::NewGoal,
  item::{Item, ItemEdit},
  store::RecordStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{BatchSummary, OrderBody, batch_response, error::ApiError, require_write};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub active: bool,
}

/// `GET /owners/:owner_id/goals[?active=true]`
pub async fn list<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path(owner_id): Path<Uuid>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Item>>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  let goals = if params.active {
    app.goals().list_active(owner_id).await?
  } else {
    app.goals().list(owner_id).await?
  };
  Ok(Json(goals))
}

/// `POST /owners/:owner_id/goals`
pub async fn create<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path(owner_id): Path<Uuid>,
  Json(body): Json<NewGoal>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  require_write(&app, owner_id).await?;
  let goal = app.goals().create(owner_id, body, app.now()).await?;
  Ok((StatusCode::CREATED, Json(goal)))
}

/// `PUT /owners/:owner_id/goals/order`
pub async fn reorder<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path(owner_id): Path<Uuid>,
  Json(body): Json<OrderBody>,
) -> Result<Json<BatchSummary>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  require_write(&app, owner_id).await?;
  batch_response(app.goals().reorder(owner_id, &body.ids).await?)
}

/// `PATCH /owners/:owner_id/goals/:id`
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
  Ok(Json(app.goals().edit(owner_id, id, &body).await?))
}

/// `DELETE /owners/:owner_id/goals/:id`
pub async fn remove<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path((owner_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<BatchSummary>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  require_write(&app, owner_id).await?;
  batch_response(app.goals().remove(owner_id, id).await?)
}

/// `POST /owners/:owner_id/goals/:id/activate`
pub async fn activate<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path((owner_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Item>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  require_write(&app, owner_id).await?;
  Ok(Json(app.goals().activate(owner_id, id).await?))
}

/// `POST /owners/:owner_id/goals/:id/deactivate`
pub async fn deactivate<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path((owner_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<BatchSummary>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  require_write(&app, owner_id).await?;
  batch_response(app.goals().deactivate(owner_id, id).await?)
}

/// `POST /owners/:owner_id/goals/:id/achieve`
pub async fn achieve<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path((owner_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<BatchSummary>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  require_write(&app, owner_id).await?;
  batch_response(app.goals().achieve(owner_id, id, app.now()).await?)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActionCount {
  pub count: u64,
}

/// `GET /owners/:owner_id/goals/:id/actions`
pub async fn action_count<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path((owner_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ActionCount>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  let count = app.goals().action_count(owner_id, id).await?;
  Ok(Json(ActionCount { count }))
}
