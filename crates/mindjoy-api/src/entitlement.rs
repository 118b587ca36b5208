//! Handlers for the entitlement endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/owners/:owner_id/entitlement` | Stored and effective status |
//! | `POST` | `/owners/:owner_id/entitlement` | Create the default record if absent |
//! | `POST` | `/owners/:owner_id/entitlement/trial` | (Re)start a trial now |
//! | `POST` | `/owners/:owner_id/entitlement/active` | Mark as subscribed |
//! | `GET`  | `/owners/:owner_id/access` | The gate's current decision |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use mindjoy_core::{
  Mindjoy,
  clock::Clock,
  entitlement::{EntitlementRecord, EntitlementView},
  gate::Access,
  store::RecordStore,
};
use uuid::Uuid;

use crate::error::ApiError;

/// `GET /owners/:owner_id/entitlement`
pub async fn describe<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path(owner_id): Path<Uuid>,
) -> Result<Json<EntitlementView>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  Ok(Json(app.entitlements().describe(owner_id, app.now()).await?))
}

/// `POST /owners/:owner_id/entitlement`
pub async fn ensure<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path(owner_id): Path<Uuid>,
) -> Result<Json<EntitlementRecord>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  Ok(Json(app.entitlements().ensure_record(owner_id).await?))
}

/// `POST /owners/:owner_id/entitlement/trial`
pub async fn grant_trial<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path(owner_id): Path<Uuid>,
) -> Result<Json<EntitlementRecord>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  Ok(Json(app.entitlements().grant_trial(owner_id, app.now()).await?))
}

/// `POST /owners/:owner_id/entitlement/active`
pub async fn grant_active<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path(owner_id): Path<Uuid>,
) -> Result<Json<EntitlementRecord>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  Ok(Json(app.entitlements().grant_active(owner_id).await?))
}

/// `GET /owners/:owner_id/access`
pub async fn access<S, C>(
  State(app): State<Arc<Mindjoy<S, C>>>,
  Path(owner_id): Path<Uuid>,
) -> Result<Json<Access>, ApiError>
where
  S: RecordStore,
  C: Clock,
{
  Ok(Json(app.gate().check(owner_id, app.now()).await?))
}
