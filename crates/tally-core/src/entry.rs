//! Entries: the items being catalogued.
//!
//! Entries are never removed. "Deleting" one flips `active` to `false`, after
//! which it drops out of every list, count and single-entry read, but the row
//! itself stays in the table.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::{Error, Result, category::Category, category::validate_name};

/// Grouping key used for entries that have no category.
pub const UNCATEGORIZED: &str = "Uncategorized";

// ─── Rows ────────────────────────────────────────────────────────────────────

/// A persisted entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
  pub id:          Uuid,
  pub name:        String,
  pub description: Option<String>,
  /// Foreign key into the category table; `None` means uncategorised.
  pub category_id: Option<Uuid>,
  /// Soft-delete flag. `false` rows are invisible to every read path.
  pub active:      bool,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// An entry joined with the category it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryWithCategory {
  #[serde(flatten)]
  pub entry:    Entry,
  pub category: Option<Category>,
}

/// Bucket entries by their category's name, using [`UNCATEGORIZED`] for
/// entries without one. Entries keep their relative order within a bucket.
///
/// Two categories that share a name share a bucket.
pub fn group_by_category_name(
  entries: Vec<EntryWithCategory>,
) -> BTreeMap<String, Vec<EntryWithCategory>> {
  let mut groups: BTreeMap<String, Vec<EntryWithCategory>> = BTreeMap::new();
  for entry in entries {
    let key = entry
      .category
      .as_ref()
      .map(|c| c.name.clone())
      .unwrap_or_else(|| UNCATEGORIZED.to_owned());
    groups.entry(key).or_default().push(entry);
  }
  groups
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Body of `POST /v1/entry`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct NewEntry {
  pub name:        String,
  #[serde(default)]
  pub category_id: Option<Uuid>,
  #[serde(default)]
  pub description: Option<String>,
}

impl NewEntry {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), category_id: None, description: None }
  }

  pub fn in_category(mut self, category_id: Uuid) -> Self {
    self.category_id = Some(category_id);
    self
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = Some(description.into());
    self
  }

  pub fn validate(&self) -> Result<()> {
    validate_name(&self.name)?;
    if let Some(description) = &self.description {
      validate_description(description)?;
    }
    Ok(())
  }
}

/// Body of `PUT /v1/entry/:id`.
///
/// The nullable columns use `Option<Option<_>>`: an absent key leaves the
/// column alone, an explicit `null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct EntryPatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name:        Option<String>,
  #[serde(
    default,
    deserialize_with = "present",
    skip_serializing_if = "Option::is_none"
  )]
  pub category_id: Option<Option<Uuid>>,
  #[serde(
    default,
    deserialize_with = "present",
    skip_serializing_if = "Option::is_none"
  )]
  pub description: Option<Option<String>>,
}

impl EntryPatch {
  pub fn is_empty(&self) -> bool {
    self.name.is_none() && self.category_id.is_none() && self.description.is_none()
  }

  pub fn validate(&self) -> Result<()> {
    if self.is_empty() {
      return Err(Error::EmptyPatch);
    }
    if let Some(name) = &self.name {
      validate_name(name)?;
    }
    if let Some(Some(description)) = &self.description {
      validate_description(description)?;
    }
    Ok(())
  }
}

fn validate_description(description: &str) -> Result<()> {
  if description.is_empty() {
    return Err(Error::Validation(
      "description must be null or a non-empty string".into(),
    ));
  }
  Ok(())
}

/// Marks a key as present even when its value is `null`.
fn present<'de, T, D>(de: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
  T: Deserialize<'de>,
  D: Deserializer<'de>,
{
  Option::<T>::deserialize(de).map(Some)
}
