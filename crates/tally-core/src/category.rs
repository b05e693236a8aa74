//! Categories: the named buckets entries are filed under.
//!
//! A category has no soft-delete flag. Its `id` is assigned once at creation
//! and survives every update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Rows ────────────────────────────────────────────────────────────────────

/// A persisted category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
  pub id:         Uuid,
  pub name:       String,
  /// Server-assigned; never changes after creation.
  pub created_at: DateTime<Utc>,
  /// Server-assigned; refreshed on every update.
  pub updated_at: DateTime<Utc>,
}

/// A category together with the number of *active* entries filed under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWithCount {
  #[serde(flatten)]
  pub category:    Category,
  pub entry_count: u64,
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Body of `POST /v1/category`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewCategory {
  pub name: String,
}

impl NewCategory {
  pub fn new(name: impl Into<String>) -> Self { Self { name: name.into() } }

  pub fn validate(&self) -> Result<()> { validate_name(&self.name) }
}

/// Body of `PUT /v1/category/:id`. Only present fields are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryPatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
}

impl CategoryPatch {
  pub fn is_empty(&self) -> bool { self.name.is_none() }

  /// Reject an empty patch, then check each present field.
  pub fn validate(&self) -> Result<()> {
    if self.is_empty() {
      return Err(Error::EmptyPatch);
    }
    if let Some(name) = &self.name {
      validate_name(name)?;
    }
    Ok(())
  }
}

pub(crate) fn validate_name(name: &str) -> Result<()> {
  if name.is_empty() {
    return Err(Error::Validation("name must not be empty".into()));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_category_rejects_unknown_fields() {
    let err = serde_json::from_str::<NewCategory>(r#"{"name":"a","colour":"red"}"#);
    assert!(err.is_err());
  }

  #[test]
  fn new_category_requires_name() {
    assert!(serde_json::from_str::<NewCategory>("{}").is_err());
    let empty: NewCategory = serde_json::from_str(r#"{"name":""}"#).unwrap();
    assert!(matches!(empty.validate(), Err(Error::Validation(_))));
  }

  #[test]
  fn empty_patch_is_rejected() {
    let patch: CategoryPatch = serde_json::from_str("{}").unwrap();
    assert!(matches!(patch.validate(), Err(Error::EmptyPatch)));
  }

  #[test]
  fn patch_with_name_is_accepted() {
    let patch: CategoryPatch = serde_json::from_str(r#"{"name":"Books"}"#).unwrap();
    assert!(patch.validate().is_ok());
  }

  #[test]
  fn with_count_flattens_category_fields() {
    let now = Utc::now();
    let row = CategoryWithCount {
      category:    Category {
        id:         Uuid::new_v4(),
        name:       "Books".into(),
        created_at: now,
        updated_at: now,
      },
      entry_count: 3,
    };
    let json = serde_json::to_value(&row).unwrap();
    assert_eq!(json["name"], "Books");
    assert_eq!(json["entryCount"], 3);
    assert!(json.get("createdAt").is_some());
    assert!(json.get("category").is_none());
  }
}
