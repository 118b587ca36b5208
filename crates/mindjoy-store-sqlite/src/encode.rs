//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings and calendar days are `YYYY-MM-DD`, so both
//! compare correctly as text. UUIDs are hyphenated lowercase strings. Item
//! payloads are compact JSON without the kind tag.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use mindjoy_core::{
  entitlement::{EntitlementRecord, SubscriptionStatus},
  habit::{CustomHabit, HabitCompletion, HabitRef, HabitType, SelectedHabit},
  item::{Item, ItemBody, ItemKind},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── Time ────────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

/// Parse a strum-backed enum column.
pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::UnknownValue { column, value: s.to_owned() })
}

pub fn decode_habit(habit_type: &str, habit_id: &str) -> Result<HabitRef> {
  let habit_type: HabitType = decode_enum("habit_type", habit_type)?;
  Ok(HabitRef::new(habit_type, decode_uuid(habit_id)?))
}

// ─── Items ───────────────────────────────────────────────────────────────────

/// The indexed columns derived from an item payload.
pub struct ScopeColumns {
  pub date:         Option<String>,
  pub status:       Option<String>,
  pub principle_id: Option<String>,
  pub goal_id:      Option<String>,
  pub body_json:    String,
}

impl ScopeColumns {
  pub fn of(body: &ItemBody) -> Result<Self> {
    Ok(Self {
      date:         body.date().map(encode_date),
      status:       body.goal_status().map(|s| s.as_ref().to_owned()),
      principle_id: body.principle_id().map(encode_uuid),
      goal_id:      body.goal_id().map(encode_uuid),
      body_json:    body.to_json()?.to_string(),
    })
  }
}

/// Raw strings read directly from an `items` row.
pub struct RawItem {
  pub item_id:    String,
  pub owner_id:   String,
  pub kind:       String,
  pub position:   i64,
  pub body_json:  String,
  pub created_at: String,
}

impl RawItem {
  pub const COLUMNS: &'static str = "item_id, owner_id, kind, position, body_json, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      item_id:    row.get(0)?,
      owner_id:   row.get(1)?,
      kind:       row.get(2)?,
      position:   row.get(3)?,
      body_json:  row.get(4)?,
      created_at: row.get(5)?,
    })
  }

  pub fn into_item(self) -> Result<Item> {
    let kind: ItemKind = decode_enum("kind", &self.kind)?;
    let data: serde_json::Value = serde_json::from_str(&self.body_json)?;
    let position = u32::try_from(self.position).map_err(|_| Error::UnknownValue {
      column: "position",
      value:  self.position.to_string(),
    })?;
    Ok(Item {
      item_id: decode_uuid(&self.item_id)?,
      owner_id: decode_uuid(&self.owner_id)?,
      position,
      created_at: decode_dt(&self.created_at)?,
      body: ItemBody::from_parts(kind, data)?,
    })
  }
}

// ─── Entitlements ────────────────────────────────────────────────────────────

pub struct RawEntitlement {
  pub owner_id:     String,
  pub status:       String,
  pub trial_anchor: Option<String>,
}

impl RawEntitlement {
  pub fn into_record(self) -> Result<EntitlementRecord> {
    Ok(EntitlementRecord {
      owner_id:     decode_uuid(&self.owner_id)?,
      status:       decode_enum::<SubscriptionStatus>("status", &self.status)?,
      trial_anchor: self.trial_anchor.as_deref().map(decode_dt).transpose()?,
    })
  }
}

// ─── Habits ──────────────────────────────────────────────────────────────────

pub struct RawCustomHabit {
  pub habit_id:   String,
  pub owner_id:   String,
  pub title:      String,
  pub created_at: String,
}

impl RawCustomHabit {
  pub fn into_habit(self) -> Result<CustomHabit> {
    Ok(CustomHabit {
      habit_id:   decode_uuid(&self.habit_id)?,
      owner_id:   decode_uuid(&self.owner_id)?,
      title:      self.title,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawSelectedHabit {
  pub owner_id:   String,
  pub habit_type: String,
  pub habit_id:   String,
  pub added_at:   String,
}

impl RawSelectedHabit {
  pub fn into_selected(self) -> Result<SelectedHabit> {
    Ok(SelectedHabit {
      owner_id: decode_uuid(&self.owner_id)?,
      habit:    decode_habit(&self.habit_type, &self.habit_id)?,
      added_at: decode_dt(&self.added_at)?,
    })
  }
}

pub struct RawCompletion {
  pub owner_id:     String,
  pub habit_type:   String,
  pub habit_id:     String,
  pub date:         String,
  pub is_completed: bool,
  pub completed_at: Option<String>,
}

impl RawCompletion {
  pub const COLUMNS: &'static str =
    "owner_id, habit_type, habit_id, date, is_completed, completed_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      owner_id:     row.get(0)?,
      habit_type:   row.get(1)?,
      habit_id:     row.get(2)?,
      date:         row.get(3)?,
      is_completed: row.get(4)?,
      completed_at: row.get(5)?,
    })
  }

  pub fn into_completion(self) -> Result<HabitCompletion> {
    Ok(HabitCompletion {
      owner_id:     decode_uuid(&self.owner_id)?,
      habit:        decode_habit(&self.habit_type, &self.habit_id)?,
      date:         decode_date(&self.date)?,
      is_completed: self.is_completed,
      completed_at: self.completed_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dates_sort_as_text() {
    let a = encode_date(NaiveDate::from_ymd_opt(2024, 9, 30).unwrap());
    let b = encode_date(NaiveDate::from_ymd_opt(2024, 10, 1).unwrap());
    assert!(a < b);
    assert_eq!(decode_date(&b).unwrap(), NaiveDate::from_ymd_opt(2024, 10, 1).unwrap());
  }

  #[test]
  fn unknown_enum_value_is_an_error() {
    let err = decode_enum::<ItemKind>("kind", "habit").unwrap_err();
    assert!(matches!(err, Error::UnknownValue { column: "kind", .. }));
  }
}
