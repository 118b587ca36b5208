//! The write gate in front of the positioned collections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{
  Result,
  entitlement::{Entitlements, SubscriptionStatus},
  store::RecordStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "status", rename_all = "lowercase")]
pub enum Access {
  Granted(SubscriptionStatus),
  Denied(SubscriptionStatus),
}

impl Access {
  pub fn from_status(status: SubscriptionStatus) -> Self {
    if status.permits_writes() {
      Self::Granted(status)
    } else {
      Self::Denied(status)
    }
  }

  pub fn is_granted(self) -> bool { matches!(self, Self::Granted(_)) }

  pub fn status(self) -> SubscriptionStatus {
    match self {
      Self::Granted(s) | Self::Denied(s) => s,
    }
  }
}

pub struct AccessGate<'a, S> {
  entitlements: Entitlements<'a, S>,
}

impl<'a, S: RecordStore> AccessGate<'a, S> {
  pub fn new(store: &'a S) -> Self { Self { entitlements: Entitlements::new(store) } }

  /// Decide whether `owner_id` may write at `now`. Evaluated fresh on every
  /// call.
  pub async fn check(&self, owner_id: Uuid, now: DateTime<Utc>) -> Result<Access> {
    let status = self.entitlements.check_status(owner_id, now).await?;
    let access = Access::from_status(status);
    if !access.is_granted() {
      debug!(%owner_id, %status, "write denied");
    }
    Ok(access)
  }
}
