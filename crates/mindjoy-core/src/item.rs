//! Positioned items: the shared shape of daily tasks, goals, and principles.
//!
//! Every item carries a dense zero-based `position` within its scope. The
//! kind-specific payload lives in [`ItemBody`]; the variant name doubles as the
//! `kind` discriminant stored by backends.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::Result;

/// Most tasks a single owner may plan for one day.
pub const MAX_TASKS_PER_DAY: usize = 4;

/// Most goals a single owner may have `active` at once.
pub const MAX_ACTIVE_GOALS: usize = 5;

// ─── Kind ────────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ItemKind {
  Task,
  Goal,
  Principle,
}

impl ItemKind {
  /// Upper bound on the active scope, if any.
  pub fn capacity(self) -> Option<usize> {
    match self {
      Self::Task => Some(MAX_TASKS_PER_DAY),
      Self::Goal => Some(MAX_ACTIVE_GOALS),
      Self::Principle => None,
    }
  }

  /// Whether a position-0 item must exist before any other is created.
  pub fn requires_primary(self) -> bool { matches!(self, Self::Task) }

  /// Whether removing the primary item clears the whole scope. Secondaries
  /// cannot exist without a primary, so a task day goes with its primary.
  pub fn clears_scope_with_primary(self) -> bool {
    matches!(self, Self::Task)
  }

  pub fn is_date_scoped(self) -> bool { matches!(self, Self::Task) }
}

// ─── Goal status ─────────────────────────────────────────────────────────────

/// `inactive ⇄ active → achieved`; achieved is terminal.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GoalStatus {
  Active,
  Inactive,
  Achieved,
}

impl GoalStatus {
  pub fn can_transition_to(self, next: GoalStatus) -> bool {
    use GoalStatus::*;
    matches!(
      (self, next),
      (Inactive, Active) | (Active, Inactive) | (Active, Achieved)
    )
  }
}

// ─── Payloads ────────────────────────────────────────────────────────────────

/// One of the (at most four) things an owner commits to on a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskValue {
  pub date:         NaiveDate,
  pub title:        String,
  pub principle_id: Uuid,
  pub goal_id:      Option<Uuid>,
  #[serde(default)]
  pub is_completed: bool,
  pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalValue {
  pub title:        String,
  pub description:  Option<String>,
  pub principle_id: Uuid,
  pub status:       GoalStatus,
  pub achieved_at:  Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrincipleValue {
  pub title:       String,
  pub description: Option<String>,
}

/// The typed payload of an item. The variant name is the `kind` discriminant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ItemBody {
  Task(TaskValue),
  Goal(GoalValue),
  Principle(PrincipleValue),
}

impl ItemBody {
  pub fn kind(&self) -> ItemKind {
    match self {
      Self::Task(_) => ItemKind::Task,
      Self::Goal(_) => ItemKind::Goal,
      Self::Principle(_) => ItemKind::Principle,
    }
  }

  /// The day a task belongs to.
  pub fn date(&self) -> Option<NaiveDate> {
    match self {
      Self::Task(t) => Some(t.date),
      _ => None,
    }
  }

  pub fn goal_status(&self) -> Option<GoalStatus> {
    match self {
      Self::Goal(g) => Some(g.status),
      _ => None,
    }
  }

  pub fn principle_id(&self) -> Option<Uuid> {
    match self {
      Self::Task(t) => Some(t.principle_id),
      Self::Goal(g) => Some(g.principle_id),
      Self::Principle(_) => None,
    }
  }

  pub fn goal_id(&self) -> Option<Uuid> {
    match self {
      Self::Task(t) => t.goal_id,
      _ => None,
    }
  }

  pub fn title(&self) -> &str {
    match self {
      Self::Task(t) => &t.title,
      Self::Goal(g) => &g.title,
      Self::Principle(p) => &p.title,
    }
  }

  /// Whether the item participates in its scope's position density. Only
  /// `active` goals do; tasks and principles always do.
  pub fn is_active(&self) -> bool {
    match self {
      Self::Goal(g) => g.status == GoalStatus::Active,
      _ => true,
    }
  }

  /// Apply the fields of `edit` that make sense for this kind.
  pub fn apply_edit(&mut self, edit: &ItemEdit) {
    match self {
      Self::Task(t) => {
        if let Some(title) = &edit.title {
          t.title = title.clone();
        }
        if let Some(principle_id) = edit.principle_id {
          t.principle_id = principle_id;
        }
        if let Some(goal_id) = edit.goal_id {
          t.goal_id = goal_id;
        }
      }
      Self::Goal(g) => {
        if let Some(title) = &edit.title {
          g.title = title.clone();
        }
        if let Some(description) = &edit.description {
          g.description = description.clone();
        }
        if let Some(principle_id) = edit.principle_id {
          g.principle_id = principle_id;
        }
      }
      Self::Principle(p) => {
        if let Some(title) = &edit.title {
          p.title = title.clone();
        }
        if let Some(description) = &edit.description {
          p.description = description.clone();
        }
      }
    }
  }

  /// Serialise the inner payload (without the kind tag) for storage.
  pub fn to_json(&self) -> Result<serde_json::Value> {
    let full = serde_json::to_value(self)?;
    Ok(full.get("data").cloned().unwrap_or(serde_json::Value::Null))
  }

  /// Rebuild from a stored kind discriminant and JSON payload.
  pub fn from_parts(kind: ItemKind, data: serde_json::Value) -> Result<Self> {
    let wrapped = serde_json::json!({ "kind": kind.as_ref(), "data": data });
    Ok(serde_json::from_value(wrapped)?)
  }
}

// ─── Item ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
  pub item_id:    Uuid,
  pub owner_id:   Uuid,
  pub position:   u32,
  pub created_at: DateTime<Utc>,
  pub body:       ItemBody,
}

impl Item {
  pub fn kind(&self) -> ItemKind { self.body.kind() }

  pub fn is_active(&self) -> bool { self.body.is_active() }

  pub fn is_primary(&self) -> bool { self.is_active() && self.position == 0 }
}

/// Input to [`crate::store::RecordStore::create_item`]. The id is assigned by
/// the store.
#[derive(Debug, Clone)]
pub struct NewItem {
  pub owner_id:   Uuid,
  pub position:   u32,
  pub created_at: DateTime<Utc>,
  pub body:       ItemBody,
}

/// Absolute-value update of an existing item. `None` leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
  pub position: Option<u32>,
  pub body:     Option<ItemBody>,
}

impl ItemPatch {
  pub fn position(position: u32) -> Self {
    Self { position: Some(position), body: None }
  }

  pub fn body(body: ItemBody) -> Self { Self { position: None, body: Some(body) } }
}

/// Edit of the non-positional fields. Never touches `position` or goal status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemEdit {
  pub title:        Option<String>,
  /// `Some(None)` clears the description.
  #[serde(default, with = "double_option")]
  pub description:  Option<Option<String>>,
  pub principle_id: Option<Uuid>,
  /// `Some(None)` unlinks the task from its goal.
  #[serde(default, with = "double_option")]
  pub goal_id:      Option<Option<Uuid>>,
}

/// Distinguishes an absent field from an explicit `null`.
mod double_option {
  use serde::{Deserialize, Deserializer, Serialize, Serializer};

  pub fn serialize<T, S>(value: &Option<Option<T>>, s: S) -> Result<S::Ok, S::Error>
  where
    T: Serialize,
    S: Serializer,
  {
    match value {
      Some(inner) => inner.serialize(s),
      None => s.serialize_none(),
    }
  }

  pub fn deserialize<'de, T, D>(d: D) -> Result<Option<Option<T>>, D::Error>
  where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
  {
    Option::<T>::deserialize(d).map(Some)
  }
}
