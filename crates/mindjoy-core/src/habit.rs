//! Habit selection and completion records.
//!
//! A habit is either drawn from the system catalogue or defined by the owner.
//! Completions are sparse: a missing record for a day means "not completed".

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

// ─── Reference ───────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HabitType {
  System,
  Custom,
}

/// Which catalogue a habit id belongs to.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(tag = "habit_type", content = "habit_id", rename_all = "lowercase")]
pub enum HabitRef {
  System(Uuid),
  Custom(Uuid),
}

impl HabitRef {
  pub fn new(habit_type: HabitType, id: Uuid) -> Self {
    match habit_type {
      HabitType::System => Self::System(id),
      HabitType::Custom => Self::Custom(id),
    }
  }

  pub fn habit_type(self) -> HabitType {
    match self {
      Self::System(_) => HabitType::System,
      Self::Custom(_) => HabitType::Custom,
    }
  }

  pub fn id(self) -> Uuid {
    match self {
      Self::System(id) | Self::Custom(id) => id,
    }
  }
}

// ─── Catalogue ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemHabit {
  pub habit_id: Uuid,
  pub title:    String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomHabit {
  pub habit_id:   Uuid,
  pub owner_id:   Uuid,
  pub title:      String,
  pub created_at: DateTime<Utc>,
}

// ─── Ledger records ──────────────────────────────────────────────────────────

/// One habit in an owner's selection. `added_at` anchors the all-time
/// completion-rate denominator and survives re-selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedHabit {
  pub owner_id: Uuid,
  pub habit:    HabitRef,
  pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitCompletion {
  pub owner_id:     Uuid,
  pub habit:        HabitRef,
  pub date:         NaiveDate,
  pub is_completed: bool,
  pub completed_at: Option<DateTime<Utc>>,
}

// ─── Rates ───────────────────────────────────────────────────────────────────

/// The window a completion rate is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "range", rename_all = "snake_case")]
pub enum DateRange {
  /// From the day the habit was added through today.
  AllTime,
  /// Inclusive on both ends; never counts days before the habit was added.
  Between { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionRate {
  pub completed_days: u32,
  pub total_days:     u32,
  /// `completed_days / total_days`, or `0.0` for an empty window.
  pub rate:           f64,
}

impl CompletionRate {
  /// Rate over the inclusive window `[start, end]`, counting only completed
  /// records that fall inside it.
  pub fn over<'a>(
    start: NaiveDate,
    end: NaiveDate,
    completions: impl IntoIterator<Item = &'a HabitCompletion>,
  ) -> Self {
    if end < start {
      return Self { completed_days: 0, total_days: 0, rate: 0.0 };
    }
    let total_days = ((end - start).num_days() + 1) as u32;
    let completed_days = completions
      .into_iter()
      .filter(|c| c.is_completed && c.date >= start && c.date <= end)
      .count() as u32;
    Self {
      completed_days,
      total_days,
      rate: f64::from(completed_days) / f64::from(total_days),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn day(d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2024, 6, d).unwrap() }

  fn done(habit: HabitRef, date: NaiveDate, is_completed: bool) -> HabitCompletion {
    HabitCompletion {
      owner_id: Uuid::nil(),
      habit,
      date,
      is_completed,
      completed_at: None,
    }
  }

  #[test]
  fn habit_ref_serialises_as_tagged_pair() {
    let id = Uuid::new_v4();
    let json = serde_json::to_value(HabitRef::Custom(id)).unwrap();
    assert_eq!(json["habit_type"], "custom");
    assert_eq!(json["habit_id"], id.to_string());
  }

  #[test]
  fn rate_counts_only_completed_days_in_window() {
    let h = HabitRef::System(Uuid::new_v4());
    let records = vec![
      done(h, day(1), true),
      done(h, day(3), true),
      done(h, day(4), false),
      done(h, day(9), true),
    ];
    let rate = CompletionRate::over(day(2), day(5), &records);
    assert_eq!(rate.completed_days, 1);
    assert_eq!(rate.total_days, 4);
    assert!((rate.rate - 0.25).abs() < f64::EPSILON);
  }

  #[test]
  fn inverted_window_is_empty() {
    let rate = CompletionRate::over(day(5), day(4), &[]);
    assert_eq!(rate.total_days, 0);
    assert_eq!(rate.rate, 0.0);
  }
}
