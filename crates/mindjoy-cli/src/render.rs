//! Plain-text rendering of API responses for the terminal.

use std::fmt::Write as _;

use mindjoy_core::{
  entitlement::EntitlementView,
  item::{GoalStatus, Item, ItemBody},
  ledger::{HabitDay, WeeklyHabitProgress},
  progress::TaskProgress,
};

// ─── Items ────────────────────────────────────────────────────────────────────

/// One line per item: primary marker, state, title, then the id.
pub fn item_line(item: &Item) -> String {
  let marker = if item.is_primary() { '*' } else { ' ' };
  let state = match &item.body {
    ItemBody::Task(t) if t.is_completed => "[x]".to_string(),
    ItemBody::Task(_) => "[ ]".to_string(),
    ItemBody::Goal(g) => match g.status {
      GoalStatus::Active => format!("#{}", item.position + 1),
      GoalStatus::Inactive => "--".to_string(),
      GoalStatus::Achieved => "ok".to_string(),
    },
    ItemBody::Principle(_) => format!("#{}", item.position + 1),
  };
  format!("{marker} {state:<4} {}  ({})", item.body.title(), item.item_id)
}

pub fn items(items: &[Item]) -> String {
  if items.is_empty() {
    return "(nothing here)".to_string();
  }
  items.iter().map(item_line).collect::<Vec<_>>().join("\n")
}

// ─── Entitlement ──────────────────────────────────────────────────────────────

pub fn entitlement(view: &EntitlementView) -> String {
  let mut out = format!("status: {}", view.effective);
  if view.stored != view.effective {
    let _ = write!(out, " (stored as {})", view.stored);
  }
  if let Some(ends) = view.trial_ends_at {
    let _ = write!(out, "\ntrial ends: {}", ends.format("%Y-%m-%d %H:%M UTC"));
  }
  out
}

// ─── Habits ───────────────────────────────────────────────────────────────────

pub fn habit_day(days: &[HabitDay]) -> String {
  if days.is_empty() {
    return "(no habits selected)".to_string();
  }
  days
    .iter()
    .map(|d| {
      let check = if d.is_completed { "[x]" } else { "[ ]" };
      format!("{check} {}  ({} {})", d.title, d.habit.habit_type(), d.habit.id())
    })
    .collect::<Vec<_>>()
    .join("\n")
}

/// A seven-cell strip per habit, `x` for a completed day, then the rate.
pub fn habit_week(rows: &[WeeklyHabitProgress]) -> String {
  if rows.is_empty() {
    return "(no habits selected)".to_string();
  }
  let width = rows.iter().map(|r| r.title.len()).max().unwrap_or(0);
  rows
    .iter()
    .map(|r| {
      let strip: String = r.days.values().map(|done| if *done { 'x' } else { '.' }).collect();
      format!("{:<width$}  {strip}  {}", r.title, percent(r.rate.rate))
    })
    .collect::<Vec<_>>()
    .join("\n")
}

// ─── Progress ─────────────────────────────────────────────────────────────────

pub fn progress(p: &TaskProgress) -> String {
  let mut out = format!(
    "{}/{} tasks completed ({})",
    p.completed_tasks,
    p.total_tasks,
    percent(p.completion_rate)
  );
  if let Some(focus) = &p.most_focused {
    let _ = write!(out, "\nmost focused: {} ({} tasks)", focus.title, focus.count);
  }
  out
}

pub fn percent(rate: f64) -> String { format!("{:.0}%", rate * 100.0) }
