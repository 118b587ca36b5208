//! Daily tasks: up to four per owner per day, the first being the primary.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  collection::{PositionedCollection, Scope},
  item::{Item, ItemBody, ItemEdit, ItemKind, TaskValue},
  planner::BatchWriteResult,
  store::RecordStore,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
  pub title:        String,
  pub principle_id: Uuid,
  #[serde(default)]
  pub goal_id:      Option<Uuid>,
}

pub struct Tasks<'a, S> {
  items: PositionedCollection<'a, S>,
}

impl<'a, S: RecordStore> Tasks<'a, S> {
  pub fn new(store: &'a S) -> Self {
    Self { items: PositionedCollection::new(store, ItemKind::Task) }
  }

  /// The owner's tasks for `date`, primary first.
  pub async fn list(&self, owner_id: Uuid, date: NaiveDate) -> Result<Vec<Item>> {
    self.items.items(&Scope::tasks(owner_id, date)).await
  }

  pub async fn create(
    &self,
    owner_id: Uuid,
    date: NaiveDate,
    input: NewTask,
    now: DateTime<Utc>,
  ) -> Result<Item> {
    let body = ItemBody::Task(TaskValue {
      date,
      title: input.title,
      principle_id: input.principle_id,
      goal_id: input.goal_id,
      is_completed: false,
      completed_at: None,
    });
    self.items.create(&Scope::tasks(owner_id, date), body, now).await
  }

  /// Removing the primary task removes the whole day.
  pub async fn remove(&self, owner_id: Uuid, id: Uuid) -> Result<BatchWriteResult> {
    self.items.remove(owner_id, id).await
  }

  /// Make a task the day's primary.
  pub async fn promote(&self, owner_id: Uuid, id: Uuid) -> Result<BatchWriteResult> {
    self.items.promote(owner_id, id).await
  }

  pub async fn reorder(
    &self,
    owner_id: Uuid,
    date: NaiveDate,
    order: &[Uuid],
  ) -> Result<BatchWriteResult> {
    self.items.reorder(&Scope::tasks(owner_id, date), order).await
  }

  pub async fn edit(&self, owner_id: Uuid, id: Uuid, edit: &ItemEdit) -> Result<Item> {
    self.items.edit(owner_id, id, edit).await
  }

  /// Flip `is_completed`, stamping or clearing `completed_at`.
  pub async fn toggle_complete(
    &self,
    owner_id: Uuid,
    id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<Item> {
    let mut item = self.items.get(owner_id, id).await?;
    let ItemBody::Task(task) = &mut item.body else {
      return Err(Error::NotFound(id));
    };
    task.is_completed = !task.is_completed;
    task.completed_at = task.is_completed.then_some(now);
    self.items.replace_body(&item).await?;
    Ok(item)
  }
}
