//! [`SqliteStore`]: the SQLite implementation of [`RecordStore`].

use std::{path::Path, time::Duration};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{OptionalExtension as _, types::Value};
use tracing::{debug, warn};
use uuid::Uuid;

use mindjoy_core::{
  entitlement::EntitlementRecord,
  habit::{CustomHabit, HabitCompletion, HabitRef, SelectedHabit, SystemHabit},
  item::{Item, ItemPatch, NewItem},
  store::{ItemQuery, RecordStore},
};

use crate::{
  Error, Result,
  encode::{
    RawCompletion, RawCustomHabit, RawEntitlement, RawItem, RawSelectedHabit, ScopeColumns,
    decode_uuid, encode_date, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

/// Upper bound on a single store call unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Mindjoy record store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:    tokio_rusqlite::Connection,
  timeout: Duration,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_owned();
    debug!(path = %path.display(), "opening sqlite store");
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, timeout: DEFAULT_TIMEOUT };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, timeout: DEFAULT_TIMEOUT };
    store.init_schema().await?;
    Ok(store)
  }

  /// Bound every subsequent call by `timeout`.
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn timeout(&self) -> Duration { self.timeout }

  async fn init_schema(&self) -> Result<()> {
    self
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
  }

  /// Run `f` on the connection thread, giving up after the configured
  /// timeout.
  async fn call<F, R>(&self, f: F) -> Result<R>
  where
    F: FnOnce(&mut rusqlite::Connection) -> tokio_rusqlite::Result<R> + Send + 'static,
    R: Send + 'static,
  {
    match tokio::time::timeout(self.timeout, self.conn.call(f)).await {
      Ok(result) => Ok(result?),
      Err(_) => {
        warn!(timeout = ?self.timeout, "sqlite call timed out");
        Err(Error::Timeout(self.timeout))
      }
    }
  }
}

/// Build the `WHERE` clause and its parameters for an item query.
fn item_filter(query: &ItemQuery) -> (String, Vec<Value>) {
  let mut conds: Vec<&'static str> = vec!["owner_id = ?", "kind = ?"];
  let mut params = vec![
    Value::Text(encode_uuid(query.owner_id)),
    Value::Text(query.kind.as_ref().to_owned()),
  ];

  if let Some(date) = query.date {
    conds.push("date = ?");
    params.push(Value::Text(encode_date(date)));
  }
  if let Some(from) = query.date_from {
    conds.push("date >= ?");
    params.push(Value::Text(encode_date(from)));
  }
  if let Some(to) = query.date_to {
    conds.push("date <= ?");
    params.push(Value::Text(encode_date(to)));
  }
  if let Some(status) = query.status {
    conds.push("status = ?");
    params.push(Value::Text(status.as_ref().to_owned()));
  }
  if let Some(principle_id) = query.principle_id {
    conds.push("principle_id = ?");
    params.push(Value::Text(encode_uuid(principle_id)));
  }
  if let Some(goal_id) = query.goal_id {
    conds.push("goal_id = ?");
    params.push(Value::Text(encode_uuid(goal_id)));
  }

  (conds.join(" AND "), params)
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = Error;

  // ── Items ─────────────────────────────────────────────────────────────────

  async fn create_item(&self, input: NewItem) -> Result<Item> {
    let item = Item {
      item_id:    Uuid::new_v4(),
      owner_id:   input.owner_id,
      position:   input.position,
      created_at: input.created_at,
      body:       input.body,
    };

    let cols     = ScopeColumns::of(&item.body)?;
    let id_str   = encode_uuid(item.item_id);
    let owner    = encode_uuid(item.owner_id);
    let kind     = item.kind().as_ref().to_owned();
    let position = i64::from(item.position);
    let at_str   = encode_dt(item.created_at);

    self
      .call(move |conn| {
        conn.execute(
          "INSERT INTO items (
             item_id, owner_id, kind, position, date, status,
             principle_id, goal_id, body_json, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            id_str,
            owner,
            kind,
            position,
            cols.date,
            cols.status,
            cols.principle_id,
            cols.goal_id,
            cols.body_json,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(item)
  }

  async fn get_item(&self, id: Uuid) -> Result<Option<Item>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawItem> = self
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM items WHERE item_id = ?1", RawItem::COLUMNS),
              rusqlite::params![id_str],
              RawItem::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawItem::into_item).transpose()
  }

  async fn query_items(&self, query: &ItemQuery) -> Result<Vec<Item>> {
    let (where_clause, params) = item_filter(query);

    let raws: Vec<RawItem> = self
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM items WHERE {where_clause} ORDER BY position, created_at",
          RawItem::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawItem::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawItem::into_item).collect()
  }

  async fn count_items(&self, query: &ItemQuery) -> Result<u64> {
    let (where_clause, params) = item_filter(query);

    let count: i64 = self
      .call(move |conn| {
        let sql = format!("SELECT COUNT(*) FROM items WHERE {where_clause}");
        Ok(conn.query_row(&sql, rusqlite::params_from_iter(params), |r| r.get(0))?)
      })
      .await?;

    Ok(count.max(0) as u64)
  }

  async fn update_item(&self, id: Uuid, patch: ItemPatch) -> Result<bool> {
    let mut sets: Vec<&'static str> = Vec::new();
    let mut params: Vec<Value> = Vec::new();

    if let Some(position) = patch.position {
      sets.push("position = ?");
      params.push(Value::Integer(i64::from(position)));
    }
    if let Some(body) = &patch.body {
      let cols = ScopeColumns::of(body)?;
      sets.extend(["date = ?", "status = ?", "principle_id = ?", "goal_id = ?", "body_json = ?"]);
      params.extend([
        cols.date.map_or(Value::Null, Value::Text),
        cols.status.map_or(Value::Null, Value::Text),
        cols.principle_id.map_or(Value::Null, Value::Text),
        cols.goal_id.map_or(Value::Null, Value::Text),
        Value::Text(cols.body_json),
      ]);
    }

    if sets.is_empty() {
      return Ok(self.get_item(id).await?.is_some());
    }
    params.push(Value::Text(encode_uuid(id)));

    let changed = self
      .call(move |conn| {
        let sql = format!("UPDATE items SET {} WHERE item_id = ?", sets.join(", "));
        Ok(conn.execute(&sql, rusqlite::params_from_iter(params))?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn delete_item(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let changed = self
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM items WHERE item_id = ?1", rusqlite::params![id_str])?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn delete_items(&self, query: &ItemQuery) -> Result<u64> {
    let (where_clause, params) = item_filter(query);

    let changed = self
      .call(move |conn| {
        let sql = format!("DELETE FROM items WHERE {where_clause}");
        Ok(conn.execute(&sql, rusqlite::params_from_iter(params))?)
      })
      .await?;

    Ok(changed as u64)
  }

  // ── Entitlements ──────────────────────────────────────────────────────────

  async fn get_entitlement(&self, owner_id: Uuid) -> Result<Option<EntitlementRecord>> {
    let owner = encode_uuid(owner_id);

    let raw: Option<RawEntitlement> = self
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT owner_id, status, trial_anchor FROM entitlements WHERE owner_id = ?1",
              rusqlite::params![owner],
              |row| {
                Ok(RawEntitlement {
                  owner_id:     row.get(0)?,
                  status:       row.get(1)?,
                  trial_anchor: row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawEntitlement::into_record).transpose()
  }

  async fn put_entitlement(&self, record: EntitlementRecord) -> Result<()> {
    let owner  = encode_uuid(record.owner_id);
    let status = record.status.as_ref().to_owned();
    let anchor = record.trial_anchor.map(encode_dt);

    self
      .call(move |conn| {
        conn.execute(
          "INSERT INTO entitlements (owner_id, status, trial_anchor) VALUES (?1, ?2, ?3)
           ON CONFLICT(owner_id) DO UPDATE
             SET status = excluded.status, trial_anchor = excluded.trial_anchor",
          rusqlite::params![owner, status, anchor],
        )?;
        Ok(())
      })
      .await
  }

  async fn insert_entitlement_if_absent(&self, record: EntitlementRecord) -> Result<bool> {
    let owner  = encode_uuid(record.owner_id);
    let status = record.status.as_ref().to_owned();
    let anchor = record.trial_anchor.map(encode_dt);

    let changed = self
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT OR IGNORE INTO entitlements (owner_id, status, trial_anchor)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![owner, status, anchor],
        )?)
      })
      .await?;

    Ok(changed == 1)
  }

  // ── Habit catalogue ───────────────────────────────────────────────────────

  /// Idempotent on `title`: seeding the same habit twice returns the first.
  async fn add_system_habit(&self, title: String) -> Result<SystemHabit> {
    let fresh = encode_uuid(Uuid::new_v4());

    let (id_str, title): (String, String) = self
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO system_habits (habit_id, title) VALUES (?1, ?2)",
          rusqlite::params![fresh, title],
        )?;
        Ok(conn.query_row(
          "SELECT habit_id, title FROM system_habits WHERE title = ?1",
          rusqlite::params![title],
          |r| Ok((r.get(0)?, r.get(1)?)),
        )?)
      })
      .await?;

    Ok(SystemHabit { habit_id: decode_uuid(&id_str)?, title })
  }

  async fn list_system_habits(&self) -> Result<Vec<SystemHabit>> {
    let rows: Vec<(String, String)> = self
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT habit_id, title FROM system_habits ORDER BY title")?;
        let rows = stmt
          .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(id, title)| Ok(SystemHabit { habit_id: decode_uuid(&id)?, title }))
      .collect()
  }

  async fn create_custom_habit(
    &self,
    owner_id: Uuid,
    title: String,
    created_at: DateTime<Utc>,
  ) -> Result<CustomHabit> {
    let habit = CustomHabit { habit_id: Uuid::new_v4(), owner_id, title, created_at };

    let id_str = encode_uuid(habit.habit_id);
    let owner  = encode_uuid(owner_id);
    let title  = habit.title.clone();
    let at_str = encode_dt(created_at);

    self
      .call(move |conn| {
        conn.execute(
          "INSERT INTO custom_habits (habit_id, owner_id, title, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, owner, title, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(habit)
  }

  async fn list_custom_habits(&self, owner_id: Uuid) -> Result<Vec<CustomHabit>> {
    let owner = encode_uuid(owner_id);

    let raws: Vec<RawCustomHabit> = self
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT habit_id, owner_id, title, created_at FROM custom_habits
           WHERE owner_id = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![owner], |row| {
            Ok(RawCustomHabit {
              habit_id:   row.get(0)?,
              owner_id:   row.get(1)?,
              title:      row.get(2)?,
              created_at: row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCustomHabit::into_habit).collect()
  }

  async fn rename_custom_habit(
    &self,
    owner_id: Uuid,
    habit_id: Uuid,
    title: String,
  ) -> Result<bool> {
    let owner  = encode_uuid(owner_id);
    let id_str = encode_uuid(habit_id);

    let changed = self
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE custom_habits SET title = ?1 WHERE habit_id = ?2 AND owner_id = ?3",
          rusqlite::params![title, id_str, owner],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn delete_custom_habit(&self, owner_id: Uuid, habit_id: Uuid) -> Result<bool> {
    let owner  = encode_uuid(owner_id);
    let id_str = encode_uuid(habit_id);

    let changed = self
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM custom_habits WHERE habit_id = ?1 AND owner_id = ?2",
          rusqlite::params![id_str, owner],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn habit_title(&self, habit: HabitRef) -> Result<Option<String>> {
    let table = match habit {
      HabitRef::System(_) => "system_habits",
      HabitRef::Custom(_) => "custom_habits",
    };
    let id_str = encode_uuid(habit.id());

    self
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT title FROM {table} WHERE habit_id = ?1"),
              rusqlite::params![id_str],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await
  }

  // ── Habit ledger ──────────────────────────────────────────────────────────

  async fn list_selected_habits(&self, owner_id: Uuid) -> Result<Vec<SelectedHabit>> {
    let owner = encode_uuid(owner_id);

    let raws: Vec<RawSelectedHabit> = self
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT owner_id, habit_type, habit_id, added_at FROM selected_habits
           WHERE owner_id = ?1 ORDER BY added_at, habit_type, habit_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![owner], |row| {
            Ok(RawSelectedHabit {
              owner_id:   row.get(0)?,
              habit_type: row.get(1)?,
              habit_id:   row.get(2)?,
              added_at:   row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSelectedHabit::into_selected).collect()
  }

  async fn replace_selected_habits(
    &self,
    owner_id: Uuid,
    selection: Vec<SelectedHabit>,
  ) -> Result<()> {
    let owner = encode_uuid(owner_id);
    let rows: Vec<(String, String, String)> = selection
      .iter()
      .map(|s| {
        (
          s.habit.habit_type().as_ref().to_owned(),
          encode_uuid(s.habit.id()),
          encode_dt(s.added_at),
        )
      })
      .collect();

    self
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM selected_habits WHERE owner_id = ?1",
          rusqlite::params![owner],
        )?;
        {
          let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO selected_habits (owner_id, habit_type, habit_id, added_at)
             VALUES (?1, ?2, ?3, ?4)",
          )?;
          for (habit_type, habit_id, added_at) in rows {
            stmt.execute(rusqlite::params![owner, habit_type, habit_id, added_at])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await
  }

  async fn remove_selected_habit(&self, owner_id: Uuid, habit: HabitRef) -> Result<()> {
    let owner      = encode_uuid(owner_id);
    let habit_type = habit.habit_type().as_ref().to_owned();
    let id_str     = encode_uuid(habit.id());

    self
      .call(move |conn| {
        conn.execute(
          "DELETE FROM selected_habits
           WHERE owner_id = ?1 AND habit_type = ?2 AND habit_id = ?3",
          rusqlite::params![owner, habit_type, id_str],
        )?;
        Ok(())
      })
      .await
  }

  async fn get_completion(
    &self,
    owner_id: Uuid,
    habit: HabitRef,
    date: NaiveDate,
  ) -> Result<Option<HabitCompletion>> {
    let owner      = encode_uuid(owner_id);
    let habit_type = habit.habit_type().as_ref().to_owned();
    let id_str     = encode_uuid(habit.id());
    let date_str   = encode_date(date);

    let raw: Option<RawCompletion> = self
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM habit_completions
                 WHERE owner_id = ?1 AND habit_type = ?2 AND habit_id = ?3 AND date = ?4",
                RawCompletion::COLUMNS
              ),
              rusqlite::params![owner, habit_type, id_str, date_str],
              RawCompletion::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCompletion::into_completion).transpose()
  }

  async fn put_completion(&self, completion: HabitCompletion) -> Result<()> {
    let owner        = encode_uuid(completion.owner_id);
    let habit_type   = completion.habit.habit_type().as_ref().to_owned();
    let id_str       = encode_uuid(completion.habit.id());
    let date_str     = encode_date(completion.date);
    let is_completed = completion.is_completed;
    let completed_at = completion.completed_at.map(encode_dt);

    self
      .call(move |conn| {
        conn.execute(
          "INSERT INTO habit_completions (
             owner_id, habit_type, habit_id, date, is_completed, completed_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT(owner_id, habit_type, habit_id, date) DO UPDATE
             SET is_completed = excluded.is_completed,
                 completed_at = excluded.completed_at",
          rusqlite::params![owner, habit_type, id_str, date_str, is_completed, completed_at],
        )?;
        Ok(())
      })
      .await
  }

  async fn list_completions(
    &self,
    owner_id: Uuid,
    habit: Option<HabitRef>,
    from: NaiveDate,
    to: NaiveDate,
  ) -> Result<Vec<HabitCompletion>> {
    let mut sql = format!(
      "SELECT {} FROM habit_completions WHERE owner_id = ? AND date >= ? AND date <= ?",
      RawCompletion::COLUMNS
    );
    let mut params = vec![
      Value::Text(encode_uuid(owner_id)),
      Value::Text(encode_date(from)),
      Value::Text(encode_date(to)),
    ];
    if let Some(habit) = habit {
      sql.push_str(" AND habit_type = ? AND habit_id = ?");
      params.push(Value::Text(habit.habit_type().as_ref().to_owned()));
      params.push(Value::Text(encode_uuid(habit.id())));
    }
    sql.push_str(" ORDER BY date");

    let raws: Vec<RawCompletion> = self
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawCompletion::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCompletion::into_completion).collect()
  }
}
