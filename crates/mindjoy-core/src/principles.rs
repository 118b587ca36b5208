//! Principles: an unbounded, densely ordered list per owner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  collection::{PositionedCollection, Scope},
  item::{Item, ItemBody, ItemEdit, ItemKind, PrincipleValue},
  planner::BatchWriteResult,
  store::{ItemQuery, RecordStore},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPrinciple {
  pub title:       String,
  #[serde(default)]
  pub description: Option<String>,
}

pub struct Principles<'a, S> {
  store: &'a S,
  items: PositionedCollection<'a, S>,
}

impl<'a, S: RecordStore> Principles<'a, S> {
  pub fn new(store: &'a S) -> Self {
    Self { store, items: PositionedCollection::new(store, ItemKind::Principle) }
  }

  pub async fn list(&self, owner_id: Uuid) -> Result<Vec<Item>> {
    self.items.items(&Scope::principles(owner_id)).await
  }

  pub async fn create(
    &self,
    owner_id: Uuid,
    input: NewPrinciple,
    now: DateTime<Utc>,
  ) -> Result<Item> {
    let body = ItemBody::Principle(PrincipleValue {
      title:       input.title,
      description: input.description,
    });
    self.items.create(&Scope::principles(owner_id), body, now).await
  }

  /// Refused while any task or goal still points at the principle.
  pub async fn remove(&self, owner_id: Uuid, id: Uuid) -> Result<BatchWriteResult> {
    for kind in [ItemKind::Task, ItemKind::Goal] {
      let query = ItemQuery::new(owner_id, kind).with_principle(id);
      let uses = self.store.count_items(&query).await.map_err(Error::store)?;
      if uses > 0 {
        return Err(Error::PrincipleInUse(id));
      }
    }
    self.items.remove(owner_id, id).await
  }

  pub async fn promote(&self, owner_id: Uuid, id: Uuid) -> Result<BatchWriteResult> {
    self.items.promote(owner_id, id).await
  }

  pub async fn reorder(&self, owner_id: Uuid, order: &[Uuid]) -> Result<BatchWriteResult> {
    self.items.reorder(&Scope::principles(owner_id), order).await
  }

  pub async fn edit(&self, owner_id: Uuid, id: Uuid, edit: &ItemEdit) -> Result<Item> {
    self.items.edit(owner_id, id, edit).await
  }
}
