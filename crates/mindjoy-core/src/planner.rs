//! Reorder planner: turns a desired ordering into position writes.
//!
//! Plans are pure. Positions are recomputed from the requested index, never
//! from deltas, so re-running a reorder after a partial failure repairs the
//! scope. Writes come out in ascending target-position order; a concurrent
//! reader may briefly observe two items sharing a position.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  item::ItemPatch,
  store::RecordStore,
};

/// One absolute position assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionWrite {
  pub item_id:  Uuid,
  pub position: u32,
}

/// An item's id and its current position.
pub type Slot = (Uuid, u32);

// ─── Plans ───────────────────────────────────────────────────────────────────

/// Writes that bring `current` into the order given by `order`.
///
/// `order` must be a permutation of the ids in `current`: a missing id would
/// silently leave a gap, so it is rejected along with duplicates and unknown
/// ids. Ids already at their index produce no write.
pub fn plan_reorder(current: &[Slot], order: &[Uuid]) -> Result<Vec<PositionWrite>> {
  let positions: HashMap<Uuid, u32> = current.iter().copied().collect();

  let mut seen = HashSet::with_capacity(order.len());
  for id in order {
    if !positions.contains_key(id) {
      return Err(Error::InvalidReorderSet(format!("{id} is not in this scope")));
    }
    if !seen.insert(*id) {
      return Err(Error::InvalidReorderSet(format!("{id} appears twice")));
    }
  }
  if seen.len() != positions.len() {
    let missing = positions.len() - seen.len();
    return Err(Error::InvalidReorderSet(format!(
      "{missing} item(s) of this scope are missing from the ordering"
    )));
  }

  Ok(
    order
      .iter()
      .zip(0u32..)
      .filter(|(id, index)| positions[*id] != *index)
      .map(|(id, index)| PositionWrite { item_id: *id, position: index })
      .collect(),
  )
}

/// Writes that move `target` to position 0.
///
/// Items before the target's old position shift up by one; items after it are
/// left alone. Returns `None` if `target` is not in `current`.
pub fn plan_promote(current: &[Slot], target: Uuid) -> Option<Vec<PositionWrite>> {
  let (_, old) = current.iter().copied().find(|(id, _)| *id == target)?;
  if old == 0 {
    return Some(Vec::new());
  }

  let mut shifted: Vec<PositionWrite> = current
    .iter()
    .filter(|(id, pos)| *id != target && *pos < old)
    .map(|(id, pos)| PositionWrite { item_id: *id, position: pos + 1 })
    .collect();
  shifted.sort_by_key(|w| w.position);

  let mut writes = Vec::with_capacity(shifted.len() + 1);
  writes.push(PositionWrite { item_id: target, position: 0 });
  writes.extend(shifted);
  Some(writes)
}

/// Writes that close the gap left at `removed` by an item leaving the scope.
pub fn plan_gap_close(remaining: &[Slot], removed: u32) -> Vec<PositionWrite> {
  let mut writes: Vec<PositionWrite> = remaining
    .iter()
    .filter(|(_, pos)| *pos > removed)
    .map(|(id, pos)| PositionWrite { item_id: *id, position: pos - 1 })
    .collect();
  writes.sort_by_key(|w| w.position);
  writes
}

// ─── Execution ───────────────────────────────────────────────────────────────

/// The write that stopped a batch.
#[derive(Debug)]
pub struct FailedWrite {
  pub write: PositionWrite,
  pub error: Error,
}

/// Outcome of applying a plan one write at a time.
///
/// There is no transaction underneath: on failure, `applied` lists what is
/// already in the store and `pending` what was never attempted. The caller
/// decides whether to re-fetch and retry.
#[derive(Debug, Default)]
pub struct BatchWriteResult {
  pub applied: Vec<PositionWrite>,
  pub failed:  Option<FailedWrite>,
  pub pending: Vec<PositionWrite>,
}

impl BatchWriteResult {
  pub fn empty() -> Self { Self::default() }

  pub fn is_complete(&self) -> bool { self.failed.is_none() }

  /// The applied writes, or the error that interrupted the batch.
  pub fn into_result(self) -> Result<Vec<PositionWrite>> {
    match self.failed {
      None => Ok(self.applied),
      Some(failed) => Err(failed.error),
    }
  }
}

/// Issue `writes` sequentially, awaiting each before the next.
pub async fn apply_writes<S: RecordStore>(
  store: &S,
  writes: Vec<PositionWrite>,
) -> BatchWriteResult {
  let mut applied = Vec::with_capacity(writes.len());
  let mut iter = writes.into_iter();

  while let Some(write) = iter.next() {
    match store.update_item(write.item_id, ItemPatch::position(write.position)).await {
      Ok(found) => {
        if !found {
          debug!(item_id = %write.item_id, "position write hit a deleted item");
        }
        applied.push(write);
      }
      Err(e) => {
        let error = Error::store(e);
        let pending: Vec<PositionWrite> = iter.collect();
        warn!(
          item_id = %write.item_id,
          applied = applied.len(),
          pending = pending.len(),
          %error,
          "position batch stopped partway"
        );
        return BatchWriteResult {
          applied,
          failed: Some(FailedWrite { write, error }),
          pending,
        };
      }
    }
  }

  BatchWriteResult { applied, failed: None, pending: Vec::new() }
}
