//! Subscription and trial state machine.
//!
//! The stored status is only ever changed by a grant. Trial expiry is never
//! written back: it is derived from the stored anchor every time the status is
//! read, so callers must re-check at use time rather than cache a result.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tracing::info;
use uuid::Uuid;

use crate::{Error, Result, store::RecordStore};

/// Length of a trial window.
pub const TRIAL_LENGTH_DAYS: i64 = 7;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SubscriptionStatus {
  Trial,
  Active,
  Expired,
}

impl SubscriptionStatus {
  /// Whether an owner in this state may create or change items.
  pub fn permits_writes(self) -> bool { !matches!(self, Self::Expired) }
}

/// What the store holds for an owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitlementRecord {
  pub owner_id:     Uuid,
  pub status:       SubscriptionStatus,
  /// Set each time a trial is granted.
  pub trial_anchor: Option<DateTime<Utc>>,
}

impl EntitlementRecord {
  pub fn expired(owner_id: Uuid) -> Self {
    Self { owner_id, status: SubscriptionStatus::Expired, trial_anchor: None }
  }

  pub fn trial_ends_at(&self) -> Option<DateTime<Utc>> {
    match self.status {
      SubscriptionStatus::Trial => self
        .trial_anchor
        .map(|anchor| anchor + Duration::days(TRIAL_LENGTH_DAYS)),
      _ => None,
    }
  }

  /// The status after applying trial expiry. A trial lapses strictly after
  /// `trial_ends_at`; a trial without an anchor has nothing to expire against
  /// and stays a trial.
  pub fn effective_status(&self, now: DateTime<Utc>) -> SubscriptionStatus {
    match (self.status, self.trial_ends_at()) {
      (SubscriptionStatus::Trial, Some(ends_at)) if now > ends_at => {
        SubscriptionStatus::Expired
      }
      (status, _) => status,
    }
  }
}

/// Read model for display: stored vs. effective status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitlementView {
  pub owner_id:      Uuid,
  pub stored:        SubscriptionStatus,
  pub effective:     SubscriptionStatus,
  pub trial_ends_at: Option<DateTime<Utc>>,
}

// ─── Machine ─────────────────────────────────────────────────────────────────

pub struct Entitlements<'a, S> {
  store: &'a S,
}

impl<'a, S: RecordStore> Entitlements<'a, S> {
  pub fn new(store: &'a S) -> Self { Self { store } }

  async fn record(&self, owner_id: Uuid) -> Result<Option<EntitlementRecord>> {
    self.store.get_entitlement(owner_id).await.map_err(Error::store)
  }

  /// Effective status of `owner_id` at `now`; `expired` when no record exists.
  pub async fn check_status(
    &self,
    owner_id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<SubscriptionStatus> {
    Ok(
      self
        .record(owner_id)
        .await?
        .map(|r| r.effective_status(now))
        .unwrap_or(SubscriptionStatus::Expired),
    )
  }

  pub async fn describe(
    &self,
    owner_id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<EntitlementView> {
    let record = self
      .record(owner_id)
      .await?
      .unwrap_or_else(|| EntitlementRecord::expired(owner_id));
    Ok(EntitlementView {
      owner_id,
      stored: record.status,
      effective: record.effective_status(now),
      trial_ends_at: record.trial_ends_at(),
    })
  }

  /// Create the default `expired` record on first access; return whatever is
  /// stored afterwards.
  pub async fn ensure_record(&self, owner_id: Uuid) -> Result<EntitlementRecord> {
    let default = EntitlementRecord::expired(owner_id);
    self
      .store
      .insert_entitlement_if_absent(default.clone())
      .await
      .map_err(Error::store)?;
    Ok(self.record(owner_id).await?.unwrap_or(default))
  }

  /// Start (or restart) a trial at `now`. Re-granting always resets the
  /// anchor.
  pub async fn grant_trial(
    &self,
    owner_id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<EntitlementRecord> {
    let record = EntitlementRecord {
      owner_id,
      status: SubscriptionStatus::Trial,
      trial_anchor: Some(now),
    };
    self.store.put_entitlement(record.clone()).await.map_err(Error::store)?;
    info!(%owner_id, anchor = %now, "trial granted");
    Ok(record)
  }

  /// Mark the owner as a paying subscriber. Never expires on its own.
  pub async fn grant_active(&self, owner_id: Uuid) -> Result<EntitlementRecord> {
    let trial_anchor = self.record(owner_id).await?.and_then(|r| r.trial_anchor);
    let record = EntitlementRecord {
      owner_id,
      status: SubscriptionStatus::Active,
      trial_anchor,
    };
    self.store.put_entitlement(record.clone()).await.map_err(Error::store)?;
    info!(%owner_id, "subscription activated");
    Ok(record)
  }
}
