//! Tag-based query cache.
//!
//! Every cached query provides one [`Tag`]. Every mutation names the tags it
//! invalidates, and [`QueryCache::invalidate`] evicts each cached query whose
//! provided tag is covered by one of them. A tag without an id covers the
//! whole kind; a tag with an id covers only that id.

use std::{
  collections::HashMap,
  sync::{Mutex, MutexGuard, PoisonError},
};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

// ─── Tags ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TagKind {
  Category,
  CategoryList,
  Entry,
  EntryList,
  /// Entry views partitioned by category: the grouped listing (no id) and
  /// the per-category listings (with id).
  EntryByCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
  pub kind: TagKind,
  pub id:   Option<Uuid>,
}

impl Tag {
  /// The unparameterised tag for `kind`.
  pub const fn all(kind: TagKind) -> Self { Self { kind, id: None } }

  pub const fn with_id(kind: TagKind, id: Uuid) -> Self { Self { kind, id: Some(id) } }

  /// Whether invalidating `self` evicts a query that provided `provided`.
  pub fn covers(&self, provided: &Tag) -> bool {
    self.kind == provided.kind && (self.id.is_none() || self.id == provided.id)
  }

  /// Whether either tag covers the other.
  pub fn overlaps(&self, other: &Tag) -> bool {
    self.covers(other) || other.covers(self)
  }
}

// ─── Queries ──────────────────────────────────────────────────────────────────

/// Key of a cacheable read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Query {
  CategoryById(Uuid),
  Categories,
  EntryById(Uuid),
  Entries,
  EntriesGrouped,
  EntriesByCategoryId(Uuid),
}

impl Query {
  pub fn provides(&self) -> Tag {
    use TagKind::*;
    match *self {
      Self::CategoryById(id) => Tag::with_id(Category, id),
      Self::Categories => Tag::all(CategoryList),
      Self::EntryById(id) => Tag::with_id(Entry, id),
      Self::Entries => Tag::all(EntryList),
      Self::EntriesGrouped => Tag::all(EntryByCategory),
      Self::EntriesByCategoryId(id) => Tag::with_id(EntryByCategory, id),
    }
  }
}

// ─── Mutations ────────────────────────────────────────────────────────────────

/// A write, described by what it touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
  CreateCategory,
  UpdateCategory { id: Uuid },
  DeleteCategory { id: Uuid },
  /// `category_id` is the category of the created entry.
  CreateEntry { category_id: Option<Uuid> },
  /// `category_id` is the category named in the update, if it named one.
  UpdateEntry { id: Uuid, category_id: Option<Uuid> },
  DeleteEntry { id: Uuid },
}

impl Mutation {
  /// Tags to invalidate once the mutation has succeeded.
  ///
  /// Anything that can change an entry's category association clears both
  /// the grouped partition and the specific category partition.
  pub fn invalidates(&self) -> Vec<Tag> {
    use TagKind::*;
    let by_category = Tag::all(EntryByCategory);
    let in_category = |id: Uuid| Tag::with_id(EntryByCategory, id);

    match *self {
      Self::CreateCategory => vec![Tag::all(CategoryList), by_category],
      Self::UpdateCategory { id } => vec![
        Tag::with_id(Category, id),
        Tag::all(CategoryList),
        by_category,
        in_category(id),
      ],
      Self::DeleteCategory { id } => vec![
        Tag::with_id(Category, id),
        Tag::all(CategoryList),
        Tag::all(EntryList),
        by_category,
        in_category(id),
      ],
      Self::CreateEntry { category_id } => {
        let mut tags = vec![Tag::all(EntryList), by_category];
        tags.extend(category_id.map(in_category));
        tags
      }
      Self::UpdateEntry { id, category_id } => {
        let mut tags = vec![Tag::with_id(Entry, id), Tag::all(EntryList), by_category];
        tags.extend(category_id.map(in_category));
        tags
      }
      Self::DeleteEntry { .. } => vec![Tag::all(EntryList), by_category],
    }
  }
}

// ─── Cache ────────────────────────────────────────────────────────────────────

/// Published to subscribers after every invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
  pub tags:    Vec<Tag>,
  pub evicted: Vec<Query>,
}

struct Cached {
  value:    Value,
  provides: Tag,
}

/// Query results stored as JSON, keyed by [`Query`].
pub struct QueryCache {
  entries: Mutex<HashMap<Query, Cached>>,
  events:  broadcast::Sender<Invalidation>,
}

impl Default for QueryCache {
  fn default() -> Self { Self::new() }
}

impl QueryCache {
  pub fn new() -> Self {
    let (events, _) = broadcast::channel(64);
    Self { entries: Mutex::new(HashMap::new()), events }
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<Query, Cached>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// The cached result for `query`, if present and still of shape `T`.
  pub fn get<T: DeserializeOwned>(&self, query: &Query) -> Option<T> {
    let value = self.lock().get(query)?.value.clone();
    serde_json::from_value(value).ok()
  }

  pub fn insert<T: Serialize>(&self, query: Query, value: &T) -> serde_json::Result<()> {
    let value = serde_json::to_value(value)?;
    self.lock().insert(query, Cached { value, provides: query.provides() });
    Ok(())
  }

  pub fn contains(&self, query: &Query) -> bool { self.lock().contains_key(query) }

  pub fn len(&self) -> usize { self.lock().len() }

  pub fn is_empty(&self) -> bool { self.lock().is_empty() }

  /// Evict every query whose provided tag is covered by one of `tags` and
  /// notify subscribers. Returns the evicted keys.
  pub fn invalidate(&self, tags: &[Tag]) -> Vec<Query> {
    let evicted: Vec<Query> = {
      let mut entries = self.lock();
      let keys: Vec<Query> = entries
        .iter()
        .filter(|(_, cached)| tags.iter().any(|t| t.covers(&cached.provides)))
        .map(|(key, _)| *key)
        .collect();
      for key in &keys {
        entries.remove(key);
      }
      keys
    };

    tracing::debug!(?tags, evicted = evicted.len(), "cache invalidated");
    // No subscribers is fine.
    let _ = self.events.send(Invalidation { tags: tags.to_vec(), evicted: evicted.clone() });
    evicted
  }

  /// Every invalidation, as it happens.
  pub fn subscribe(&self) -> broadcast::Receiver<Invalidation> { self.events.subscribe() }

  /// Invalidations that touch `tag`'s partition.
  pub fn watch(&self, tag: Tag) -> TagWatch { TagWatch { tag, rx: self.subscribe() } }
}

/// Subscription to invalidations of a single partition.
pub struct TagWatch {
  tag: Tag,
  rx:  broadcast::Receiver<Invalidation>,
}

impl TagWatch {
  /// Wait for the next invalidation overlapping the watched tag. Returns
  /// `None` once the cache is dropped.
  pub async fn changed(&mut self) -> Option<Invalidation> {
    loop {
      match self.rx.recv().await {
        Ok(event) if event.tags.iter().any(|t| t.overlaps(&self.tag)) => return Some(event),
        Ok(_) => {}
        Err(broadcast::error::RecvError::Lagged(skipped)) => {
          tracing::warn!(skipped, "cache watcher lagged");
        }
        Err(broadcast::error::RecvError::Closed) => return None,
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn id() -> Uuid { Uuid::new_v4() }

  #[test]
  fn bare_tag_covers_every_id_of_its_kind() {
    let a = id();
    let bare = Tag::all(TagKind::EntryByCategory);
    assert!(bare.covers(&Tag::all(TagKind::EntryByCategory)));
    assert!(bare.covers(&Tag::with_id(TagKind::EntryByCategory, a)));
    assert!(!bare.covers(&Tag::all(TagKind::EntryList)));
  }

  #[test]
  fn tagged_id_covers_only_that_id() {
    let (a, b) = (id(), id());
    let tag = Tag::with_id(TagKind::Category, a);
    assert!(tag.covers(&Tag::with_id(TagKind::Category, a)));
    assert!(!tag.covers(&Tag::with_id(TagKind::Category, b)));
    assert!(!tag.covers(&Tag::all(TagKind::Category)));
    assert!(tag.overlaps(&Tag::all(TagKind::Category)));
  }

  #[test]
  fn update_category_rules() {
    let c = id();
    let tags = Mutation::UpdateCategory { id: c }.invalidates();
    assert_eq!(tags, vec![
      Tag::with_id(TagKind::Category, c),
      Tag::all(TagKind::CategoryList),
      Tag::all(TagKind::EntryByCategory),
      Tag::with_id(TagKind::EntryByCategory, c),
    ]);
  }

  #[test]
  fn delete_category_also_clears_entry_list() {
    let tags = Mutation::DeleteCategory { id: id() }.invalidates();
    assert!(tags.contains(&Tag::all(TagKind::EntryList)));
    assert_eq!(tags.len(), 5);
  }

  #[test]
  fn entry_mutations_name_the_category_partition_when_known() {
    let c = id();
    let with = Mutation::CreateEntry { category_id: Some(c) }.invalidates();
    assert!(with.contains(&Tag::with_id(TagKind::EntryByCategory, c)));
    let without = Mutation::CreateEntry { category_id: None }.invalidates();
    assert_eq!(without, vec![Tag::all(TagKind::EntryList), Tag::all(TagKind::EntryByCategory)]);

    let e = id();
    let update = Mutation::UpdateEntry { id: e, category_id: Some(c) }.invalidates();
    assert_eq!(update, vec![
      Tag::with_id(TagKind::Entry, e),
      Tag::all(TagKind::EntryList),
      Tag::all(TagKind::EntryByCategory),
      Tag::with_id(TagKind::EntryByCategory, c),
    ]);
  }

  #[test]
  fn delete_entry_leaves_entry_by_id_cached() {
    let e = id();
    let cache = QueryCache::new();
    cache.insert(Query::EntryById(e), &"dune").unwrap();
    cache.insert(Query::Entries, &"all").unwrap();

    let evicted = cache.invalidate(&Mutation::DeleteEntry { id: e }.invalidates());
    assert_eq!(evicted, vec![Query::Entries]);
    assert!(cache.contains(&Query::EntryById(e)));
  }

  #[test]
  fn create_category_evicts_every_category_partition() {
    let (a, b) = (id(), id());
    let cache = QueryCache::new();
    cache.insert(Query::EntriesByCategoryId(a), &1).unwrap();
    cache.insert(Query::EntriesByCategoryId(b), &2).unwrap();
    cache.insert(Query::EntriesGrouped, &3).unwrap();
    cache.insert(Query::CategoryById(a), &4).unwrap();

    cache.invalidate(&Mutation::CreateCategory.invalidates());
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get::<i32>(&Query::CategoryById(a)), Some(4));
  }

  #[test]
  fn get_returns_none_for_a_different_shape() {
    let cache = QueryCache::new();
    cache.insert(Query::Categories, &"text").unwrap();
    assert_eq!(cache.get::<u64>(&Query::Categories), None);
    assert_eq!(cache.get::<String>(&Query::Categories).as_deref(), Some("text"));
  }

  #[tokio::test]
  async fn subscribers_see_evicted_keys() {
    let c = id();
    let cache = QueryCache::new();
    let mut all = cache.subscribe();
    let mut watch = cache.watch(Tag::with_id(TagKind::EntryByCategory, c));
    cache.insert(Query::EntriesByCategoryId(c), &0).unwrap();

    cache.invalidate(&[Tag::all(TagKind::CategoryList)]);
    cache.invalidate(&[Tag::all(TagKind::EntryByCategory)]);

    let first = all.recv().await.unwrap();
    assert!(first.evicted.is_empty());
    let second = all.recv().await.unwrap();
    assert_eq!(second.evicted, vec![Query::EntriesByCategoryId(c)]);

    let seen = watch.changed().await.unwrap();
    assert_eq!(seen.tags, vec![Tag::all(TagKind::EntryByCategory)]);
  }
}
