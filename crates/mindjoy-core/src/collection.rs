//! The positioned collection shared by tasks, goals, and principles.
//!
//! Within a scope the active items hold the positions `0..count` exactly once
//! each, and when the scope is non-empty one item holds position 0. Every
//! operation here validates before it writes; validation failures never leave
//! partial state behind.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::{
  Error, Result,
  item::{GoalStatus, Item, ItemBody, ItemEdit, ItemKind, ItemPatch, NewItem},
  planner::{self, BatchWriteResult, Slot},
  store::{ItemQuery, RecordStore},
};

// ─── Scope ───────────────────────────────────────────────────────────────────

/// The set of items over which density and primacy are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
  pub owner_id: Uuid,
  pub kind:     ItemKind,
  /// The day, for tasks.
  pub date:     Option<NaiveDate>,
}

impl Scope {
  pub fn tasks(owner_id: Uuid, date: NaiveDate) -> Self {
    Self { owner_id, kind: ItemKind::Task, date: Some(date) }
  }

  pub fn goals(owner_id: Uuid) -> Self {
    Self { owner_id, kind: ItemKind::Goal, date: None }
  }

  pub fn principles(owner_id: Uuid) -> Self {
    Self { owner_id, kind: ItemKind::Principle, date: None }
  }

  /// The scope `item` belongs to when active.
  pub fn of(item: &Item) -> Self {
    Self {
      owner_id: item.owner_id,
      kind:     item.kind(),
      date:     item.body.date(),
    }
  }

  /// Query selecting the active members of this scope.
  pub fn query(&self) -> ItemQuery {
    let mut query = ItemQuery::new(self.owner_id, self.kind);
    if let Some(date) = self.date {
      query = query.on(date);
    }
    if self.kind == ItemKind::Goal {
      query = query.with_status(GoalStatus::Active);
    }
    query
  }
}

fn slots(items: &[Item]) -> Vec<Slot> {
  items.iter().map(|i| (i.item_id, i.position)).collect()
}

// ─── Collection ──────────────────────────────────────────────────────────────

/// One kind of positioned item over a record store. The kind decides the
/// capacity and primacy rules; see [`ItemKind`].
pub struct PositionedCollection<'a, S> {
  store: &'a S,
  kind:  ItemKind,
}

impl<'a, S: RecordStore> PositionedCollection<'a, S> {
  pub fn new(store: &'a S, kind: ItemKind) -> Self { Self { store, kind } }

  pub fn kind(&self) -> ItemKind { self.kind }

  /// Active items of `scope`, ordered by position.
  pub async fn items(&self, scope: &Scope) -> Result<Vec<Item>> {
    debug_assert_eq!(scope.kind, self.kind);
    let query = scope.query();
    self.store.query_items(&query).await.map_err(Error::store)
  }

  /// Look up an item of this kind belonging to `owner_id`.
  pub async fn find(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Item>> {
    let item = self.store.get_item(id).await.map_err(Error::store)?;
    Ok(item.filter(|i| i.owner_id == owner_id && i.kind() == self.kind))
  }

  /// Like [`find`](Self::find), but absence is an error.
  pub async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<Item> {
    self.find(owner_id, id).await?.ok_or(Error::NotFound(id))
  }

  fn check_capacity(&self, active: usize) -> Result<()> {
    match self.kind.capacity() {
      Some(max) if active >= max => {
        Err(Error::CapacityExceeded { kind: self.kind, max })
      }
      _ => Ok(()),
    }
  }

  /// Append a new item at the tail of `scope`.
  pub async fn create(
    &self,
    scope: &Scope,
    body: ItemBody,
    now: DateTime<Utc>,
  ) -> Result<Item> {
    debug_assert_eq!(body.kind(), self.kind);
    let items = self.items(scope).await?;
    self.check_capacity(items.len())?;
    if self.kind.requires_primary()
      && !items.is_empty()
      && !items.iter().any(|i| i.position == 0)
    {
      return Err(Error::PrimaryMissing);
    }

    let input = NewItem {
      owner_id: scope.owner_id,
      position: items.len() as u32,
      created_at: now,
      body,
    };
    let item = self.store.create_item(input).await.map_err(Error::store)?;
    debug!(kind = %self.kind, item_id = %item.item_id, position = item.position, "item created");
    Ok(item)
  }

  /// Remove an item and close the gap behind it.
  ///
  /// Removing a task-day's primary clears the whole day. An id that no longer
  /// exists is a no-op.
  pub async fn remove(&self, owner_id: Uuid, id: Uuid) -> Result<BatchWriteResult> {
    let Some(item) = self.find(owner_id, id).await? else {
      return Ok(BatchWriteResult::empty());
    };

    if !item.is_active() {
      self.store.delete_item(id).await.map_err(Error::store)?;
      return Ok(BatchWriteResult::empty());
    }

    let scope = Scope::of(&item);
    if self.kind.clears_scope_with_primary() && item.position == 0 {
      let query = scope.query();
      let removed = self.store.delete_items(&query).await.map_err(Error::store)?;
      debug!(kind = %self.kind, removed, "primary removed, scope cleared");
      return Ok(BatchWriteResult::empty());
    }

    self.store.delete_item(id).await.map_err(Error::store)?;
    self.close_gap(&scope, item.position).await
  }

  async fn close_gap(&self, scope: &Scope, removed: u32) -> Result<BatchWriteResult> {
    let remaining = self.items(scope).await?;
    let writes = planner::plan_gap_close(&slots(&remaining), removed);
    Ok(planner::apply_writes(self.store, writes).await)
  }

  /// Move an item to position 0, shifting the items before it down by one.
  /// An id that no longer exists is a no-op.
  pub async fn promote(&self, owner_id: Uuid, id: Uuid) -> Result<BatchWriteResult> {
    let Some(item) = self.find(owner_id, id).await? else {
      return Ok(BatchWriteResult::empty());
    };
    let items = self.items(&Scope::of(&item)).await?;
    let Some(writes) = planner::plan_promote(&slots(&items), id) else {
      // Not in the active scope (an inactive goal, for instance).
      return Err(Error::NotFound(id));
    };
    Ok(planner::apply_writes(self.store, writes).await)
  }

  /// Rewrite positions so the scope follows `order`.
  pub async fn reorder(&self, scope: &Scope, order: &[Uuid]) -> Result<BatchWriteResult> {
    let items = self.items(scope).await?;
    let writes = planner::plan_reorder(&slots(&items), order)?;
    debug!(kind = %self.kind, writes = writes.len(), "reorder planned");
    Ok(planner::apply_writes(self.store, writes).await)
  }

  /// Change the non-positional fields of an item.
  pub async fn edit(&self, owner_id: Uuid, id: Uuid, edit: &ItemEdit) -> Result<Item> {
    let mut item = self.get(owner_id, id).await?;
    item.body.apply_edit(edit);
    self.replace_body(&item).await?;
    Ok(item)
  }

  pub(crate) async fn replace_body(&self, item: &Item) -> Result<()> {
    let found = self
      .store
      .update_item(item.item_id, ItemPatch::body(item.body.clone()))
      .await
      .map_err(Error::store)?;
    if found { Ok(()) } else { Err(Error::NotFound(item.item_id)) }
  }

  /// Write `body` (which takes `item` out of the active scope) and close the
  /// gap it leaves.
  pub(crate) async fn leave_scope(
    &self,
    item: &Item,
    body: ItemBody,
  ) -> Result<BatchWriteResult> {
    debug_assert!(item.is_active() && !body.is_active());
    let scope = Scope::of(item);
    let found = self
      .store
      .update_item(item.item_id, ItemPatch::body(body))
      .await
      .map_err(Error::store)?;
    if !found {
      return Ok(BatchWriteResult::empty());
    }
    self.close_gap(&scope, item.position).await
  }

  /// Write `body` (which brings `item` into the active scope) and place the
  /// item at the tail.
  pub(crate) async fn enter_scope(&self, item: &Item, body: ItemBody) -> Result<Item> {
    debug_assert!(!item.is_active() && body.is_active());
    let mut entered = item.clone();
    entered.body = body;
    let scope = Scope::of(&entered);
    let items = self.items(&scope).await?;
    self.check_capacity(items.len())?;

    entered.position = items.len() as u32;
    let patch = ItemPatch {
      position: Some(entered.position),
      body:     Some(entered.body.clone()),
    };
    let found = self
      .store
      .update_item(item.item_id, patch)
      .await
      .map_err(Error::store)?;
    if found { Ok(entered) } else { Err(Error::NotFound(item.item_id)) }
  }
}
