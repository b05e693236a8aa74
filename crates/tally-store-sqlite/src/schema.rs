//! SQL schema for the Tally SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS categories (
    category_id TEXT PRIMARY KEY,
    name        TEXT NOT NULL CHECK (name <> ''),
    created_at  TEXT NOT NULL,   -- RFC 3339 UTC, fixed microsecond width
    updated_at  TEXT NOT NULL
);

-- Entries are soft-deleted: rows are never removed, `active` goes to 0.
CREATE TABLE IF NOT EXISTS entries (
    entry_id    TEXT PRIMARY KEY,
    name        TEXT NOT NULL CHECK (name <> ''),
    description TEXT,
    category_id TEXT REFERENCES categories(category_id),
    active      INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS entries_category_idx ON entries(category_id, active);
CREATE INDEX IF NOT EXISTS entries_created_idx  ON entries(created_at);

PRAGMA user_version = 1;
";
