//! Goals: at most five active at once, each tied to a principle.
//!
//! Only `active` goals hold meaningful positions. Deactivating or achieving a
//! goal takes it out of the active scope and closes the gap it leaves;
//! reactivating appends it at the tail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  collection::{PositionedCollection, Scope},
  item::{GoalStatus, GoalValue, Item, ItemBody, ItemEdit, ItemKind},
  planner::BatchWriteResult,
  store::{ItemQuery, RecordStore},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGoal {
  pub title:        String,
  pub principle_id: Uuid,
  #[serde(default)]
  pub description:  Option<String>,
}

pub struct Goals<'a, S> {
  store: &'a S,
  items: PositionedCollection<'a, S>,
}

impl<'a, S: RecordStore> Goals<'a, S> {
  pub fn new(store: &'a S) -> Self {
    Self { store, items: PositionedCollection::new(store, ItemKind::Goal) }
  }

  /// Every goal of the owner regardless of status.
  pub async fn list(&self, owner_id: Uuid) -> Result<Vec<Item>> {
    let query = ItemQuery::new(owner_id, ItemKind::Goal);
    self.store.query_items(&query).await.map_err(Error::store)
  }

  /// Active goals, ordered by position.
  pub async fn list_active(&self, owner_id: Uuid) -> Result<Vec<Item>> {
    self.items.items(&Scope::goals(owner_id)).await
  }

  /// New goals start active, at the tail.
  pub async fn create(
    &self,
    owner_id: Uuid,
    input: NewGoal,
    now: DateTime<Utc>,
  ) -> Result<Item> {
    let body = ItemBody::Goal(GoalValue {
      title:        input.title,
      description:  input.description,
      principle_id: input.principle_id,
      status:       GoalStatus::Active,
      achieved_at:  None,
    });
    self.items.create(&Scope::goals(owner_id), body, now).await
  }

  pub async fn remove(&self, owner_id: Uuid, id: Uuid) -> Result<BatchWriteResult> {
    self.items.remove(owner_id, id).await
  }

  pub async fn reorder(&self, owner_id: Uuid, order: &[Uuid]) -> Result<BatchWriteResult> {
    self.items.reorder(&Scope::goals(owner_id), order).await
  }

  pub async fn edit(&self, owner_id: Uuid, id: Uuid, edit: &ItemEdit) -> Result<Item> {
    self.items.edit(owner_id, id, edit).await
  }

  /// `inactive → active`, placed at the tail of the active goals.
  pub async fn activate(&self, owner_id: Uuid, id: Uuid) -> Result<Item> {
    let item = self.items.get(owner_id, id).await?;
    let mut next = goal_value(&item)?.clone();
    if next.status == GoalStatus::Active {
      return Ok(item);
    }
    transition(next.status, GoalStatus::Active)?;
    next.status = GoalStatus::Active;
    self.items.enter_scope(&item, ItemBody::Goal(next)).await
  }

  /// `active → inactive`. An id that no longer exists is a no-op.
  pub async fn deactivate(&self, owner_id: Uuid, id: Uuid) -> Result<BatchWriteResult> {
    self.leave(owner_id, id, GoalStatus::Inactive, None).await
  }

  /// `active → achieved`, stamping `achieved_at`. An id that no longer exists
  /// is a no-op.
  pub async fn achieve(
    &self,
    owner_id: Uuid,
    id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<BatchWriteResult> {
    self.leave(owner_id, id, GoalStatus::Achieved, Some(now)).await
  }

  async fn leave(
    &self,
    owner_id: Uuid,
    id: Uuid,
    to: GoalStatus,
    achieved_at: Option<DateTime<Utc>>,
  ) -> Result<BatchWriteResult> {
    let Some(item) = self.items.find(owner_id, id).await? else {
      return Ok(BatchWriteResult::empty());
    };
    let mut next = goal_value(&item)?.clone();
    if next.status == to {
      return Ok(BatchWriteResult::empty());
    }
    transition(next.status, to)?;

    next.status = to;
    next.achieved_at = achieved_at;
    self.items.leave_scope(&item, ItemBody::Goal(next)).await
  }

  /// Number of tasks ever linked to the goal.
  pub async fn action_count(&self, owner_id: Uuid, goal_id: Uuid) -> Result<u64> {
    let query = ItemQuery::new(owner_id, ItemKind::Task).with_goal(goal_id);
    self.store.count_items(&query).await.map_err(Error::store)
  }
}

fn goal_value(item: &Item) -> Result<&GoalValue> {
  match &item.body {
    ItemBody::Goal(goal) => Ok(goal),
    _ => Err(Error::NotFound(item.item_id)),
  }
}

fn transition(from: GoalStatus, to: GoalStatus) -> Result<()> {
  if from.can_transition_to(to) {
    Ok(())
  } else {
    Err(Error::InvalidTransition { from, to })
  }
}
