//! Handlers for principle endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/owners/:owner_id/principles` | Ordered by position |
//! | `POST`   | `/owners/:owner_id/principles` | Body: [`NewPrinciple`]; 201 |
//! | `PUT`    | `/owners/:owner_id/principles/order` | |
//! | `PATCH`  | `/owners/:owner_id/principles/:id` | Body: [`ItemEdit`] |
//! | `DELETE` | `/owners/:owner_id/principles/:id` | 409 while referenced |
//! | `POST`   | `/owners/:owner_id/principles/:id/promote` | |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use mindjoy_core::{
  Mindjoy,
  clock::Clock,
  item::{Item, ItemEdit},
  principles::NewPrinciple,
  store::RecordStore,
};
use uuid::Uuid;

use crate::{BatchSummary, OrderBody, batch_response, error::ApiError, require_write};

/// `GET /owners/:owner_id/principles`
pub async fn list<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path(owner_id): Path<Uuid>,
) -> Result<Json<Vec<Item>>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  Ok(Json(app.principles().list(owner_id).await?))
}

/// `POST /owners/:owner_id/principles`
pub async fn create<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path(owner_id): Path<Uuid>,
  Json(body): Json<NewPrinciple>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  require_write(&app, owner_id).await?;
  let principle = app.principles().create(owner_id, body, app.now()).await?;
  Ok((StatusCode::CREATED, Json(principle)))
}

/// `PUT /owners/:owner_id/principles/order`
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
  batch_response(app.principles().reorder(owner_id, &body.ids).await?)
}

/// `PATCH /owners/:owner_id/principles/:id`
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
  Ok(Json(app.principles().edit(owner_id, id, &body).await?))
}

/// `DELETE /owners/:owner_id/principles/:id`
pub async fn remove<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path((owner_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<BatchSummary>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  require_write(&app, owner_id).await?;
  batch_response(app.principles().remove(owner_id, id).await?)
}

/// `POST /owners/:owner_id/principles/:id/promote`
pub async fn promote<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path((owner_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<BatchSummary>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  require_write(&app, owner_id).await?;
  batch_response(app.principles().promote(owner_id, id).await?)
}
