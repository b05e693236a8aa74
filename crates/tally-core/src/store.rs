//! The `CatalogStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `tally-store-sqlite`).
//! Higher layers (`tally-api`, `tally-server`) depend on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  category::{Category, CategoryPatch, CategoryWithCount, NewCategory},
  entry::{Entry, EntryPatch, EntryWithCategory, NewEntry},
};

/// Failure classification a backend error must offer so callers can tell a
/// client mistake from a backend fault without knowing the backend.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// The dangling category id, when a write referenced a category that does
  /// not exist.
  fn unknown_category(&self) -> Option<Uuid> { None }
}

/// Abstraction over a Tally catalog backend.
///
/// Inputs are expected to have passed their `validate()` check; the store
/// enforces referential integrity but not field-level rules. Every method is
/// a single atomic statement against the backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait CatalogStore: Send + Sync {
  type Error: StoreError;

  // ── Categories ────────────────────────────────────────────────────────

  /// Insert a category under a freshly generated id.
  fn create_category(
    &self,
    input: NewCategory,
  ) -> impl Future<Output = Result<Category, Self::Error>> + Send + '_;

  /// Retrieve a category by id. Returns `None` if not found.
  fn get_category(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Category>, Self::Error>> + Send + '_;

  /// Every category with the number of active entries referencing it,
  /// oldest first.
  fn list_categories_with_entry_counts(
    &self,
  ) -> impl Future<Output = Result<Vec<CategoryWithCount>, Self::Error>> + Send + '_;

  /// Number of rows in the category table.
  fn count_categories(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Apply the present fields of `patch`. The id is never changed.
  /// Returns `None` if no category has this id.
  fn update_category(
    &self,
    id: Uuid,
    patch: CategoryPatch,
  ) -> impl Future<Output = Result<Option<Category>, Self::Error>> + Send + '_;

  // ── Entries ───────────────────────────────────────────────────────────

  /// Insert an active entry under a freshly generated id. Fails if
  /// `category_id` names a category that does not exist.
  fn create_entry(
    &self,
    input: NewEntry,
  ) -> impl Future<Output = Result<Entry, Self::Error>> + Send + '_;

  /// The entry with its category, or `None` if it is absent *or inactive*.
  fn find_active_entry_by_id(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<EntryWithCategory>, Self::Error>> + Send + '_;

  /// Active entries joined with their category, oldest first, optionally
  /// restricted to one category.
  fn list_active_entries(
    &self,
    category_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<EntryWithCategory>, Self::Error>> + Send + '_;

  /// Number of rows in the entry table, inactive rows included.
  fn count_entries(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Apply the present fields of `patch` to an active entry. Returns `None`
  /// if the entry is absent or inactive.
  fn update_entry(
    &self,
    id: Uuid,
    patch: EntryPatch,
  ) -> impl Future<Output = Result<Option<Entry>, Self::Error>> + Send + '_;

  /// Soft-delete: set `active = false` and return the row. Repeating the call
  /// on an inactive entry returns it unchanged. `None` if the id is unknown.
  fn deactivate_entry(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Entry>, Self::Error>> + Send + '_;

  /// The raw row, whatever its `active` flag. Not exposed over HTTP.
  fn get_entry_raw(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Entry>, Self::Error>> + Send + '_;
}
