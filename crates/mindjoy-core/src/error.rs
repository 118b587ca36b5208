//! Error types for `mindjoy-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::{
  item::{GoalStatus, ItemKind},
  store::StoreError,
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("{kind} capacity of {max} reached")]
  CapacityExceeded { kind: ItemKind, max: usize },

  #[error("a primary task must exist before adding secondary tasks")]
  PrimaryMissing,

  #[error("invalid reorder set: {0}")]
  InvalidReorderSet(String),

  #[error("not found: {0}")]
  NotFound(Uuid),

  #[error("goal cannot move from {from} to {to}")]
  InvalidTransition { from: GoalStatus, to: GoalStatus },

  #[error("principle {0} is still referenced by tasks or goals")]
  PrincipleInUse(Uuid),

  /// Network or timeout failure. Safe to retry with the same inputs: every
  /// write sets absolute values.
  #[error("transient store failure: {0}")]
  TransientStoreFailure(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Classify a backend error as transient or permanent.
  pub fn store<E: StoreError>(err: E) -> Self {
    if err.is_transient() {
      Self::TransientStoreFailure(Box::new(err))
    } else {
      Self::Store(Box::new(err))
    }
  }

  pub fn is_transient(&self) -> bool {
    matches!(self, Self::TransientStoreFailure(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
