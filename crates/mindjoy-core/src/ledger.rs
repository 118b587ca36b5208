//! The daily habit ledger: an owner's habit selection plus sparse per-day
//! completion records.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  habit::{
    CompletionRate, CustomHabit, DateRange, HabitCompletion, HabitRef, SelectedHabit,
    SystemHabit,
  },
  store::RecordStore,
};

/// Title used when a selected habit's catalogue entry has disappeared.
const UNKNOWN_TITLE: &str = "Unknown";

/// A selected habit as seen on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitDay {
  pub habit:        HabitRef,
  pub title:        String,
  pub is_completed: bool,
}

/// A selected habit over one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyHabitProgress {
  pub habit: HabitRef,
  pub title: String,
  pub days:  BTreeMap<NaiveDate, bool>,
  pub rate:  CompletionRate,
}

pub struct HabitLedger<'a, S> {
  store: &'a S,
}

impl<'a, S: RecordStore> HabitLedger<'a, S> {
  pub fn new(store: &'a S) -> Self { Self { store } }

  // ── Selection ─────────────────────────────────────────────────────────

  pub async fn selected(&self, owner_id: Uuid) -> Result<Vec<SelectedHabit>> {
    self.store.list_selected_habits(owner_id).await.map_err(Error::store)
  }

  /// Replace the whole selection with `habits`.
  ///
  /// Habits that stay selected keep their original `added_at`; newly selected
  /// ones are stamped with `now`. Duplicates collapse to one entry.
  pub async fn select_habits(
    &self,
    owner_id: Uuid,
    habits: &[HabitRef],
    now: DateTime<Utc>,
  ) -> Result<Vec<SelectedHabit>> {
    let previous: HashMap<HabitRef, DateTime<Utc>> = self
      .selected(owner_id)
      .await?
      .into_iter()
      .map(|s| (s.habit, s.added_at))
      .collect();

    let mut seen = HashSet::with_capacity(habits.len());
    let selection: Vec<SelectedHabit> = habits
      .iter()
      .filter(|h| seen.insert(**h))
      .map(|&habit| SelectedHabit {
        owner_id,
        habit,
        added_at: previous.get(&habit).copied().unwrap_or(now),
      })
      .collect();

    self
      .store
      .replace_selected_habits(owner_id, selection.clone())
      .await
      .map_err(Error::store)?;
    Ok(selection)
  }

  async fn selection_entry(&self, owner_id: Uuid, habit: HabitRef) -> Result<SelectedHabit> {
    self
      .selected(owner_id)
      .await?
      .into_iter()
      .find(|s| s.habit == habit)
      .ok_or(Error::NotFound(habit.id()))
  }

  async fn title(&self, habit: HabitRef) -> Result<String> {
    Ok(
      self
        .store
        .habit_title(habit)
        .await
        .map_err(Error::store)?
        .unwrap_or_else(|| UNKNOWN_TITLE.to_owned()),
    )
  }

  // ── Completions ───────────────────────────────────────────────────────

  /// Flip the day's record, or create it as completed. A missing record
  /// means "not completed", so the first toggle always marks complete.
  pub async fn toggle_completion(
    &self,
    owner_id: Uuid,
    habit: HabitRef,
    date: NaiveDate,
    now: DateTime<Utc>,
  ) -> Result<HabitCompletion> {
    let existing = self
      .store
      .get_completion(owner_id, habit, date)
      .await
      .map_err(Error::store)?;
    let is_completed = !existing.is_some_and(|c| c.is_completed);

    let completion = HabitCompletion {
      owner_id,
      habit,
      date,
      is_completed,
      completed_at: is_completed.then_some(now),
    };
    self.store.put_completion(completion.clone()).await.map_err(Error::store)?;
    Ok(completion)
  }

  /// Completed days over days in `range`, where the window never starts
  /// before the day the habit was added and never runs past `today`.
  pub async fn completion_rate(
    &self,
    owner_id: Uuid,
    habit: HabitRef,
    range: DateRange,
    today: NaiveDate,
  ) -> Result<CompletionRate> {
    let added_on = self.selection_entry(owner_id, habit).await?.added_at.date_naive();
    let (start, end) = match range {
      DateRange::AllTime => (added_on, today),
      DateRange::Between { start, end } => (start.max(added_on), end.min(today)),
    };
    if end < start {
      return Ok(CompletionRate::over(start, end, std::iter::empty()));
    }

    let completions = self
      .store
      .list_completions(owner_id, Some(habit), start, end)
      .await
      .map_err(Error::store)?;
    Ok(CompletionRate::over(start, end, &completions))
  }

  /// Every selected habit with its title and `date`'s completion flag.
  pub async fn day_view(&self, owner_id: Uuid, date: NaiveDate) -> Result<Vec<HabitDay>> {
    let selection = self.selected(owner_id).await?;
    let completions = self
      .store
      .list_completions(owner_id, None, date, date)
      .await
      .map_err(Error::store)?;

    let mut days = Vec::with_capacity(selection.len());
    for selected in selection {
      let is_completed = completions
        .iter()
        .any(|c| c.habit == selected.habit && c.is_completed);
      days.push(HabitDay {
        habit: selected.habit,
        title: self.title(selected.habit).await?,
        is_completed,
      });
    }
    Ok(days)
  }

  /// Per-habit completion over the seven days from `week_start`. The rate
  /// uses the same window as [`completion_rate`](Self::completion_rate):
  /// nothing before the habit was added, nothing after `today`.
  pub async fn weekly_progress(
    &self,
    owner_id: Uuid,
    week_start: NaiveDate,
    today: NaiveDate,
  ) -> Result<Vec<WeeklyHabitProgress>> {
    let week_end = week_start + Duration::days(6);
    let selection = self.selected(owner_id).await?;
    let completions = self
      .store
      .list_completions(owner_id, None, week_start, week_end)
      .await
      .map_err(Error::store)?;

    let mut progress = Vec::with_capacity(selection.len());
    for selected in selection {
      let mine: Vec<&HabitCompletion> =
        completions.iter().filter(|c| c.habit == selected.habit).collect();
      let days = week_start
        .iter_days()
        .take(7)
        .map(|d| (d, mine.iter().any(|c| c.date == d && c.is_completed)))
        .collect();
      let start = week_start.max(selected.added_at.date_naive());
      progress.push(WeeklyHabitProgress {
        habit: selected.habit,
        title: self.title(selected.habit).await?,
        days,
        rate: CompletionRate::over(start, week_end.min(today), mine.iter().copied()),
      });
    }
    Ok(progress)
  }

  // ── Catalogue ─────────────────────────────────────────────────────────

  pub async fn system_habits(&self) -> Result<Vec<SystemHabit>> {
    self.store.list_system_habits().await.map_err(Error::store)
  }

  pub async fn custom_habits(&self, owner_id: Uuid) -> Result<Vec<CustomHabit>> {
    self.store.list_custom_habits(owner_id).await.map_err(Error::store)
  }

  pub async fn create_custom_habit(
    &self,
    owner_id: Uuid,
    title: String,
    now: DateTime<Utc>,
  ) -> Result<CustomHabit> {
    self
      .store
      .create_custom_habit(owner_id, title, now)
      .await
      .map_err(Error::store)
  }

  pub async fn rename_custom_habit(
    &self,
    owner_id: Uuid,
    habit_id: Uuid,
    title: String,
  ) -> Result<()> {
    let found = self
      .store
      .rename_custom_habit(owner_id, habit_id, title)
      .await
      .map_err(Error::store)?;
    if found { Ok(()) } else { Err(Error::NotFound(habit_id)) }
  }

  /// Deselect, then delete. Deleting an absent habit is a no-op.
  pub async fn delete_custom_habit(&self, owner_id: Uuid, habit_id: Uuid) -> Result<()> {
    self
      .store
      .remove_selected_habit(owner_id, HabitRef::Custom(habit_id))
      .await
      .map_err(Error::store)?;
    self
      .store
      .delete_custom_habit(owner_id, habit_id)
      .await
      .map_err(Error::store)?;
    Ok(())
  }
}
