//! The `RecordStore` trait and supporting query types.
//!
//! The trait is the persistence collaborator: a remote record store reachable
//! through create / read / update / delete / query calls that may be slow or
//! fail. It offers no cross-record transactions; the collections in this crate
//! sequence individual writes and report partial progress themselves.
//!
//! Implemented by storage backends (e.g. `mindjoy-store-sqlite`).

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
  entitlement::EntitlementRecord,
  habit::{CustomHabit, HabitCompletion, HabitRef, SelectedHabit, SystemHabit},
  item::{GoalStatus, Item, ItemKind, ItemPatch, NewItem},
};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Backend errors say whether retrying the same call may succeed.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn is_transient(&self) -> bool;
}

// ─── Query type ──────────────────────────────────────────────────────────────

/// Equality and range filters over the indexed item fields. Results are
/// always ordered by `position`, then `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemQuery {
  pub owner_id:     Uuid,
  pub kind:         ItemKind,
  /// Exact day (tasks).
  pub date:         Option<NaiveDate>,
  /// Inclusive lower bound on the day (tasks).
  pub date_from:    Option<NaiveDate>,
  /// Inclusive upper bound on the day (tasks).
  pub date_to:      Option<NaiveDate>,
  pub status:       Option<GoalStatus>,
  pub principle_id: Option<Uuid>,
  pub goal_id:      Option<Uuid>,
}

impl ItemQuery {
  pub fn new(owner_id: Uuid, kind: ItemKind) -> Self {
    Self {
      owner_id,
      kind,
      date: None,
      date_from: None,
      date_to: None,
      status: None,
      principle_id: None,
      goal_id: None,
    }
  }

  pub fn on(mut self, date: NaiveDate) -> Self {
    self.date = Some(date);
    self
  }

  pub fn between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
    self.date_from = Some(from);
    self.date_to = Some(to);
    self
  }

  pub fn with_status(mut self, status: GoalStatus) -> Self {
    self.status = Some(status);
    self
  }

  pub fn with_principle(mut self, principle_id: Uuid) -> Self {
    self.principle_id = Some(principle_id);
    self
  }

  pub fn with_goal(mut self, goal_id: Uuid) -> Self {
    self.goal_id = Some(goal_id);
    self
  }

  /// Whether `item` satisfies every filter.
  pub fn matches(&self, item: &Item) -> bool {
    let date = item.body.date();
    item.owner_id == self.owner_id
      && item.kind() == self.kind
      && self.date.is_none_or(|d| date == Some(d))
      && self.date_from.is_none_or(|from| date.is_some_and(|d| d >= from))
      && self.date_to.is_none_or(|to| date.is_some_and(|d| d <= to))
      && self.status.is_none_or(|s| item.body.goal_status() == Some(s))
      && self
        .principle_id
        .is_none_or(|p| item.body.principle_id() == Some(p))
      && self.goal_id.is_none_or(|g| item.body.goal_id() == Some(g))
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Mindjoy record store backend.
///
/// Every write sets absolute values (positions, statuses, flags) so a failed
/// call can be retried with the same inputs.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait RecordStore: Send + Sync {
  type Error: StoreError;

  // ── Items ─────────────────────────────────────────────────────────────

  /// Persist a new item; the store assigns its id.
  fn create_item(
    &self,
    input: NewItem,
  ) -> impl Future<Output = Result<Item, Self::Error>> + Send + '_;

  /// Retrieve an item by id. Returns `None` if not found.
  fn get_item(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Item>, Self::Error>> + Send + '_;

  fn query_items<'a>(
    &'a self,
    query: &'a ItemQuery,
  ) -> impl Future<Output = Result<Vec<Item>, Self::Error>> + Send + 'a;

  fn count_items<'a>(
    &'a self,
    query: &'a ItemQuery,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Apply `patch` to an item. Returns `false` if the item does not exist.
  fn update_item(
    &self,
    id: Uuid,
    patch: ItemPatch,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Returns `false` if the item did not exist.
  fn delete_item(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Delete every item matching `query`; returns the number removed.
  fn delete_items<'a>(
    &'a self,
    query: &'a ItemQuery,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  // ── Entitlements ──────────────────────────────────────────────────────

  fn get_entitlement(
    &self,
    owner_id: Uuid,
  ) -> impl Future<Output = Result<Option<EntitlementRecord>, Self::Error>> + Send + '_;

  /// Upsert keyed on `owner_id`.
  fn put_entitlement(
    &self,
    record: EntitlementRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Insert only when the owner has no record yet. Returns `true` if inserted.
  fn insert_entitlement_if_absent(
    &self,
    record: EntitlementRecord,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Habit catalogue ───────────────────────────────────────────────────

  fn add_system_habit(
    &self,
    title: String,
  ) -> impl Future<Output = Result<SystemHabit, Self::Error>> + Send + '_;

  /// All system habits, ordered by title.
  fn list_system_habits(
    &self,
  ) -> impl Future<Output = Result<Vec<SystemHabit>, Self::Error>> + Send + '_;

  fn create_custom_habit(
    &self,
    owner_id: Uuid,
    title: String,
    created_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<CustomHabit, Self::Error>> + Send + '_;

  /// An owner's custom habits, newest first.
  fn list_custom_habits(
    &self,
    owner_id: Uuid,
  ) -> impl Future<Output = Result<Vec<CustomHabit>, Self::Error>> + Send + '_;

  /// Returns `false` if the owner has no such habit.
  fn rename_custom_habit(
    &self,
    owner_id: Uuid,
    habit_id: Uuid,
    title: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Returns `false` if the owner has no such habit.
  fn delete_custom_habit(
    &self,
    owner_id: Uuid,
    habit_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Resolve the display title of either kind of habit.
  fn habit_title(
    &self,
    habit: HabitRef,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + '_;

  // ── Habit ledger ──────────────────────────────────────────────────────

  /// An owner's selection, oldest first.
  fn list_selected_habits(
    &self,
    owner_id: Uuid,
  ) -> impl Future<Output = Result<Vec<SelectedHabit>, Self::Error>> + Send + '_;

  /// Delete the owner's whole selection, then insert `selection`.
  fn replace_selected_habits(
    &self,
    owner_id: Uuid,
    selection: Vec<SelectedHabit>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn remove_selected_habit(
    &self,
    owner_id: Uuid,
    habit: HabitRef,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_completion(
    &self,
    owner_id: Uuid,
    habit: HabitRef,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Option<HabitCompletion>, Self::Error>> + Send + '_;

  /// Upsert keyed on `(owner_id, habit, date)`.
  fn put_completion(
    &self,
    completion: HabitCompletion,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Completion records in the inclusive range, optionally for one habit.
  fn list_completions(
    &self,
    owner_id: Uuid,
    habit: Option<HabitRef>,
    from: NaiveDate,
    to: NaiveDate,
  ) -> impl Future<Output = Result<Vec<HabitCompletion>, Self::Error>> + Send + '_;
}
