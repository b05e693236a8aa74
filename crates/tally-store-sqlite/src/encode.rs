//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with a fixed microsecond width,
//! so lexical order is chronological order. UUIDs are stored as hyphenated
//! lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use tally_core::{
  category::{Category, CategoryWithCount},
  entry::{Entry, EntryWithCategory},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// The current time, truncated to what [`encode_dt`] keeps, so a value
/// returned from a write compares equal to the same value read back.
pub fn now() -> DateTime<Utc> {
  let now = Utc::now();
  decode_dt(&encode_dt(now)).unwrap_or(now)
}

// ─── Column lists ────────────────────────────────────────────────────────────

pub const CATEGORY_COLUMNS: &str = "category_id, name, created_at, updated_at";

pub const ENTRY_COLUMNS: &str =
  "entry_id, name, description, category_id, active, created_at, updated_at";

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `categories` row.
pub struct RawCategory {
  pub category_id: String,
  pub name:        String,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawCategory {
  /// Read [`CATEGORY_COLUMNS`] starting at column `at`.
  pub fn from_row(row: &rusqlite::Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      category_id: row.get(at)?,
      name:        row.get(at + 1)?,
      created_at:  row.get(at + 2)?,
      updated_at:  row.get(at + 3)?,
    })
  }

  /// Like [`RawCategory::from_row`], for the nullable side of a LEFT JOIN.
  pub fn from_joined_row(
    row: &rusqlite::Row<'_>,
    at: usize,
  ) -> rusqlite::Result<Option<Self>> {
    let id: Option<String> = row.get(at)?;
    match id {
      Some(_) => Self::from_row(row, at).map(Some),
      None => Ok(None),
    }
  }

  pub fn into_category(self) -> Result<Category> {
    Ok(Category {
      id:         decode_uuid(&self.category_id)?,
      name:       self.name,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// A category row plus its aggregated active-entry count.
pub struct RawCategoryWithCount {
  pub category:    RawCategory,
  pub entry_count: i64,
}

impl RawCategoryWithCount {
  pub fn into_with_count(self) -> Result<CategoryWithCount> {
    Ok(CategoryWithCount {
      category:    self.category.into_category()?,
      entry_count: u64::try_from(self.entry_count).unwrap_or_default(),
    })
  }
}

/// Raw strings read directly from an `entries` row.
pub struct RawEntry {
  pub entry_id:    String,
  pub name:        String,
  pub description: Option<String>,
  pub category_id: Option<String>,
  pub active:      bool,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawEntry {
  /// Read [`ENTRY_COLUMNS`] starting at column `at`.
  pub fn from_row(row: &rusqlite::Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      entry_id:    row.get(at)?,
      name:        row.get(at + 1)?,
      description: row.get(at + 2)?,
      category_id: row.get(at + 3)?,
      active:      row.get(at + 4)?,
      created_at:  row.get(at + 5)?,
      updated_at:  row.get(at + 6)?,
    })
  }

  pub fn into_entry(self) -> Result<Entry> {
    Ok(Entry {
      id:          decode_uuid(&self.entry_id)?,
      name:        self.name,
      description: self.description,
      category_id: self.category_id.as_deref().map(decode_uuid).transpose()?,
      active:      self.active,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// An `entries` row LEFT JOINed with its `categories` row.
pub struct RawJoinedEntry {
  pub entry:    RawEntry,
  pub category: Option<RawCategory>,
}

impl RawJoinedEntry {
  /// Expects [`ENTRY_COLUMNS`] followed by [`CATEGORY_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      entry:    RawEntry::from_row(row, 0)?,
      category: RawCategory::from_joined_row(row, 7)?,
    })
  }

  pub fn into_joined(self) -> Result<EntryWithCategory> {
    Ok(EntryWithCategory {
      entry:    self.entry.into_entry()?,
      category: self.category.map(RawCategory::into_category).transpose()?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn encoded_timestamps_sort_chronologically() {
    let early = decode_dt("2024-01-01T00:00:00Z").unwrap();
    let late  = decode_dt("2024-01-01T00:00:00.5Z").unwrap();
    assert!(encode_dt(early) < encode_dt(late));
    assert_eq!(encode_dt(early), "2024-01-01T00:00:00.000000Z");
  }

  #[test]
  fn now_survives_a_round_trip() {
    let t = now();
    assert_eq!(decode_dt(&encode_dt(t)).unwrap(), t);
  }
}
