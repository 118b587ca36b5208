//! Task completion summaries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  habit::DateRange,
  item::{Item, ItemBody, ItemKind},
  store::{ItemQuery, RecordStore},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusedPrinciple {
  pub principle_id: Uuid,
  pub title:        String,
  pub count:        u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskProgress {
  pub total_tasks:     u32,
  pub completed_tasks: u32,
  /// `completed_tasks / total_tasks`, or 0 with no tasks.
  pub completion_rate: f64,
  /// Completed tasks per principle.
  pub by_principle:    BTreeMap<Uuid, u32>,
  pub most_focused:    Option<FocusedPrinciple>,
}

impl TaskProgress {
  /// Summarise `tasks`. Ties for most-focused go to the lowest principle id.
  pub fn from_tasks(tasks: &[Item]) -> Self {
    let mut completed_tasks = 0u32;
    let mut by_principle = BTreeMap::new();
    for task in tasks {
      let ItemBody::Task(t) = &task.body else { continue };
      if t.is_completed {
        completed_tasks += 1;
        *by_principle.entry(t.principle_id).or_insert(0u32) += 1;
      }
    }

    let total_tasks = tasks.len() as u32;
    let completion_rate = if total_tasks == 0 {
      0.0
    } else {
      f64::from(completed_tasks) / f64::from(total_tasks)
    };

    let mut best: Option<(Uuid, u32)> = None;
    for (&id, &count) in &by_principle {
      if best.is_none_or(|(_, c)| count > c) {
        best = Some((id, count));
      }
    }

    Self {
      total_tasks,
      completed_tasks,
      completion_rate,
      by_principle,
      most_focused: best.map(|(principle_id, count)| FocusedPrinciple {
        principle_id,
        title: String::new(),
        count,
      }),
    }
  }
}

pub struct Progress<'a, S> {
  store: &'a S,
}

impl<'a, S: RecordStore> Progress<'a, S> {
  pub fn new(store: &'a S) -> Self { Self { store } }

  pub async fn task_progress(&self, owner_id: Uuid, range: DateRange) -> Result<TaskProgress> {
    let mut query = ItemQuery::new(owner_id, ItemKind::Task);
    if let DateRange::Between { start, end } = range {
      query = query.between(start, end);
    }
    let tasks = self.store.query_items(&query).await.map_err(Error::store)?;
    let mut progress = TaskProgress::from_tasks(&tasks);

    if let Some(focused) = progress.most_focused.as_mut() {
      let principle = self
        .store
        .get_item(focused.principle_id)
        .await
        .map_err(Error::store)?;
      focused.title = principle
        .filter(|p| p.owner_id == owner_id)
        .map(|p| p.body.title().to_owned())
        .unwrap_or_default();
    }
    Ok(progress)
  }
}
