//! Response envelopes for the collection endpoints.
//!
//! Shared between the server (which builds them) and the client (which
//! decodes them).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{category::CategoryWithCount, entry::EntryWithCategory};

/// `GET /v1/category`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryListing {
  /// Row count of the whole category table.
  pub total:      u64,
  pub categories: Vec<CategoryWithCount>,
}

/// `GET /v1/entry`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryListing {
  /// Row count of the entry table, inactive rows included; when the list is
  /// filtered by category it is the length of the filtered list instead.
  pub total:   u64,
  pub entries: EntryItems,
}

/// Either a flat list or, for `?sortByCategory=true`, a mapping from category
/// name to that category's entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryItems {
  Flat(Vec<EntryWithCategory>),
  Grouped(BTreeMap<String, Vec<EntryWithCategory>>),
}

impl EntryItems {
  /// Total number of entries, regardless of shape.
  pub fn len(&self) -> usize {
    match self {
      Self::Flat(v) => v.len(),
      Self::Grouped(m) => m.values().map(Vec::len).sum(),
    }
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}
