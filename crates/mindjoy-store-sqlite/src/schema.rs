//! SQL schema for the Mindjoy SQLite store.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Tasks, goals, and principles. The scope columns are copied out of the
-- payload so they can be filtered and indexed.
CREATE TABLE IF NOT EXISTS items (
    item_id      TEXT PRIMARY KEY,
    owner_id     TEXT NOT NULL,
    kind         TEXT NOT NULL,      -- 'task' | 'goal' | 'principle'
    position     INTEGER NOT NULL CHECK (position >= 0),
    date         TEXT,               -- YYYY-MM-DD, tasks only
    status       TEXT,               -- goals only
    principle_id TEXT,
    goal_id      TEXT,
    body_json    TEXT NOT NULL,      -- JSON payload (inner data only)
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS entitlements (
    owner_id     TEXT PRIMARY KEY,
    status       TEXT NOT NULL,      -- 'trial' | 'active' | 'expired'
    trial_anchor TEXT
);

CREATE TABLE IF NOT EXISTS system_habits (
    habit_id TEXT PRIMARY KEY,
    title    TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS custom_habits (
    habit_id   TEXT PRIMARY KEY,
    owner_id   TEXT NOT NULL,
    title      TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS selected_habits (
    owner_id   TEXT NOT NULL,
    habit_type TEXT NOT NULL,        -- 'system' | 'custom'
    habit_id   TEXT NOT NULL,
    added_at   TEXT NOT NULL,
    PRIMARY KEY (owner_id, habit_type, habit_id)
);

-- Sparse: a missing row means the habit was not completed that day.
CREATE TABLE IF NOT EXISTS habit_completions (
    owner_id     TEXT NOT NULL,
    habit_type   TEXT NOT NULL,
    habit_id     TEXT NOT NULL,
    date         TEXT NOT NULL,
    is_completed INTEGER NOT NULL,
    completed_at TEXT,
    PRIMARY KEY (owner_id, habit_type, habit_id, date)
);

CREATE INDEX IF NOT EXISTS items_scope_idx     ON items(owner_id, kind, date);
CREATE INDEX IF NOT EXISTS items_principle_idx ON items(principle_id);
CREATE INDEX IF NOT EXISTS items_goal_idx      ON items(goal_id);
CREATE INDEX IF NOT EXISTS custom_habits_owner_idx ON custom_habits(owner_id);

PRAGMA user_version = 1;
";
