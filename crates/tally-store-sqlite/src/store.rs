//! [`SqliteStore`] — the SQLite implementation of [`CatalogStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use tally_core::{
  category::{Category, CategoryPatch, CategoryWithCount, NewCategory},
  entry::{Entry, EntryPatch, EntryWithCategory, NewEntry},
  store::CatalogStore,
};

use crate::{
  encode::{
    CATEGORY_COLUMNS, ENTRY_COLUMNS, RawCategory, RawCategoryWithCount, RawEntry,
    RawJoinedEntry, encode_dt, encode_uuid, now,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Tally catalog backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn count_rows(&self, table: &'static str) -> Result<u64> {
    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?)
      })
      .await?;
    Ok(u64::try_from(count).unwrap_or_default())
  }
}

/// `true` when SQLite rejected a write because a REFERENCES target is missing.
fn is_foreign_key_violation(e: &tokio_rusqlite::Error) -> bool {
  matches!(
    e,
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(err, _))
      if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
  )
}

/// Attribute a foreign-key failure to the category id the write carried.
fn entry_write_error(e: tokio_rusqlite::Error, category_id: Option<Uuid>) -> Error {
  match category_id {
    Some(id) if is_foreign_key_violation(&e) => Error::UnknownCategory(id),
    _ => Error::Database(e),
  }
}

// ─── CatalogStore impl ───────────────────────────────────────────────────────

impl CatalogStore for SqliteStore {
  type Error = Error;

  // ── Categories ────────────────────────────────────────────────────────────

  async fn create_category(&self, input: NewCategory) -> Result<Category> {
    let at = now();
    let category = Category {
      id:         Uuid::new_v4(),
      name:       input.name,
      created_at: at,
      updated_at: at,
    };

    let id_str = encode_uuid(category.id);
    let name   = category.name.clone();
    let at_str = encode_dt(at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO categories (category_id, name, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?3)",
          rusqlite::params![id_str, name, at_str],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(category_id = %category.id, "created category");
    Ok(category)
  }

  async fn get_category(&self, id: Uuid) -> Result<Option<Category>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawCategory> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE category_id = ?1"),
            rusqlite::params![id_str],
            |row| RawCategory::from_row(row, 0),
          )
          .optional()?)
      })
      .await?;

    raw.map(RawCategory::into_category).transpose()
  }

  async fn list_categories_with_entry_counts(&self) -> Result<Vec<CategoryWithCount>> {
    let raws: Vec<RawCategoryWithCount> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT c.category_id, c.name, c.created_at, c.updated_at,
                  COUNT(e.entry_id) AS entry_count
           FROM categories c
           LEFT JOIN entries e
             ON e.category_id = c.category_id AND e.active = 1
           GROUP BY c.category_id
           ORDER BY c.created_at, c.rowid",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawCategoryWithCount {
              category:    RawCategory::from_row(row, 0)?,
              entry_count: row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCategoryWithCount::into_with_count).collect()
  }

  async fn count_categories(&self) -> Result<u64> { self.count_rows("categories").await }

  async fn update_category(
    &self,
    id:    Uuid,
    patch: CategoryPatch,
  ) -> Result<Option<Category>> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(now());

    let raw: Option<RawCategory> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "UPDATE categories
               SET name = COALESCE(?2, name), updated_at = ?3
               WHERE category_id = ?1
               RETURNING {CATEGORY_COLUMNS}"
            ),
            rusqlite::params![id_str, patch.name, at_str],
            |row| RawCategory::from_row(row, 0),
          )
          .optional()?)
      })
      .await?;

    if raw.is_some() {
      tracing::debug!(category_id = %id, "updated category");
    }
    raw.map(RawCategory::into_category).transpose()
  }

  // ── Entries ───────────────────────────────────────────────────────────────

  async fn create_entry(&self, input: NewEntry) -> Result<Entry> {
    let at = now();
    let entry = Entry {
      id:          Uuid::new_v4(),
      name:        input.name,
      description: input.description,
      category_id: input.category_id,
      active:      true,
      created_at:  at,
      updated_at:  at,
    };

    let id_str       = encode_uuid(entry.id);
    let name         = entry.name.clone();
    let description  = entry.description.clone();
    let category_str = entry.category_id.map(encode_uuid);
    let at_str       = encode_dt(at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO entries (
             entry_id, name, description, category_id, active, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)",
          rusqlite::params![id_str, name, description, category_str, at_str],
        )?;
        Ok(())
      })
      .await
      .map_err(|e| entry_write_error(e, entry.category_id))?;

    tracing::debug!(entry_id = %entry.id, "created entry");
    Ok(entry)
  }

  async fn find_active_entry_by_id(&self, id: Uuid) -> Result<Option<EntryWithCategory>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawJoinedEntry> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT e.entry_id, e.name, e.description, e.category_id, e.active,
                    e.created_at, e.updated_at,
                    c.category_id, c.name, c.created_at, c.updated_at
             FROM entries e
             LEFT JOIN categories c ON c.category_id = e.category_id
             WHERE e.entry_id = ?1 AND e.active = 1",
            rusqlite::params![id_str],
            RawJoinedEntry::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawJoinedEntry::into_joined).transpose()
  }

  async fn list_active_entries(
    &self,
    category_id: Option<Uuid>,
  ) -> Result<Vec<EntryWithCategory>> {
    let category_str = category_id.map(encode_uuid);

    let raws: Vec<RawJoinedEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT e.entry_id, e.name, e.description, e.category_id, e.active,
                  e.created_at, e.updated_at,
                  c.category_id, c.name, c.created_at, c.updated_at
           FROM entries e
           LEFT JOIN categories c ON c.category_id = e.category_id
           WHERE e.active = 1
             AND (?1 IS NULL OR e.category_id = ?1)
           ORDER BY e.created_at, e.rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![category_str], RawJoinedEntry::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawJoinedEntry::into_joined).collect()
  }

  async fn count_entries(&self) -> Result<u64> { self.count_rows("entries").await }

  async fn update_entry(&self, id: Uuid, patch: EntryPatch) -> Result<Option<Entry>> {
    let id_str           = encode_uuid(id);
    let at_str           = encode_dt(now());
    let new_category     = patch.category_id.flatten();
    let set_category     = patch.category_id.is_some();
    let category_str     = new_category.map(encode_uuid);
    let set_description  = patch.description.is_some();
    let description      = patch.description.flatten();
    let name             = patch.name;

    let raw: Option<RawEntry> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "UPDATE entries
               SET name        = COALESCE(?2, name),
                   category_id = CASE WHEN ?3 THEN ?4 ELSE category_id END,
                   description = CASE WHEN ?5 THEN ?6 ELSE description END,
                   updated_at  = ?7
               WHERE entry_id = ?1 AND active = 1
               RETURNING {ENTRY_COLUMNS}"
            ),
            rusqlite::params![
              id_str,
              name,
              set_category,
              category_str,
              set_description,
              description,
              at_str,
            ],
            |row| RawEntry::from_row(row, 0),
          )
          .optional()?)
      })
      .await
      .map_err(|e| entry_write_error(e, new_category))?;

    if raw.is_some() {
      tracing::debug!(entry_id = %id, "updated entry");
    }
    raw.map(RawEntry::into_entry).transpose()
  }

  async fn deactivate_entry(&self, id: Uuid) -> Result<Option<Entry>> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(now());

    // Right-hand sides see the pre-update row, so a second call leaves
    // `updated_at` where the first one put it.
    let raw: Option<RawEntry> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "UPDATE entries
               SET updated_at = CASE WHEN active = 1 THEN ?2 ELSE updated_at END,
                   active     = 0
               WHERE entry_id = ?1
               RETURNING {ENTRY_COLUMNS}"
            ),
            rusqlite::params![id_str, at_str],
            |row| RawEntry::from_row(row, 0),
          )
          .optional()?)
      })
      .await?;

    if raw.is_some() {
      tracing::debug!(entry_id = %id, "deactivated entry");
    }
    raw.map(RawEntry::into_entry).transpose()
  }

  async fn get_entry_raw(&self, id: Uuid) -> Result<Option<Entry>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawEntry> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE entry_id = ?1"),
            rusqlite::params![id_str],
            |row| RawEntry::from_row(row, 0),
          )
          .optional()?)
      })
      .await?;

    raw.map(RawEntry::into_entry).transpose()
  }
}
