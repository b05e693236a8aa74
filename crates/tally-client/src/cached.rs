//! [`ApiClient`] fronted by a [`QueryCache`].

use std::future::Future;

use serde::{Serialize, de::DeserializeOwned};
use tally_core::{
  category::{Category, CategoryPatch, NewCategory},
  entry::{Entry, EntryPatch, EntryWithCategory, NewEntry},
  listing::{CategoryListing, EntryListing},
};
use uuid::Uuid;

use crate::{
  cache::{Mutation, Query, QueryCache},
  client::{ApiClient, Result},
};

/// Reads are served from the cache when possible; successful writes evict
/// whatever they may have made stale.
pub struct CachedClient {
  api:   ApiClient,
  cache: QueryCache,
}

impl CachedClient {
  pub fn new(api: ApiClient) -> Self { Self { api, cache: QueryCache::new() } }

  pub fn cache(&self) -> &QueryCache { &self.cache }

  async fn query<T, F, Fut>(&self, query: Query, fetch: F) -> Result<T>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    if let Some(hit) = self.cache.get(&query) {
      tracing::debug!(?query, "cache hit");
      return Ok(hit);
    }
    tracing::debug!(?query, "cache miss");
    let value = fetch().await?;
    if let Err(e) = self.cache.insert(query, &value) {
      tracing::warn!(?query, error = %e, "result not cached");
    }
    Ok(value)
  }

  fn applied(&self, mutation: Mutation) {
    let evicted = self.cache.invalidate(&mutation.invalidates());
    tracing::debug!(?mutation, ?evicted, "mutation applied");
  }

  // ── Queries ───────────────────────────────────────────────────────────────

  pub async fn category(&self, id: Uuid) -> Result<Category> {
    self.query(Query::CategoryById(id), || self.api.get_category(id)).await
  }

  pub async fn categories(&self) -> Result<CategoryListing> {
    self.query(Query::Categories, || self.api.list_categories()).await
  }

  pub async fn entry(&self, id: Uuid) -> Result<EntryWithCategory> {
    self.query(Query::EntryById(id), || self.api.get_entry(id)).await
  }

  pub async fn entries(&self) -> Result<EntryListing> {
    self.query(Query::Entries, || self.api.list_entries()).await
  }

  pub async fn entries_grouped(&self) -> Result<EntryListing> {
    self.query(Query::EntriesGrouped, || self.api.list_entries_grouped()).await
  }

  pub async fn entries_in_category(&self, category_id: Uuid) -> Result<EntryListing> {
    self
      .query(Query::EntriesByCategoryId(category_id), || {
        self.api.list_entries_in_category(category_id)
      })
      .await
  }

  // ── Mutations ─────────────────────────────────────────────────────────────

  pub async fn create_category(&self, input: &NewCategory) -> Result<Category> {
    let category = self.api.create_category(input).await?;
    self.applied(Mutation::CreateCategory);
    Ok(category)
  }

  pub async fn update_category(&self, id: Uuid, patch: &CategoryPatch) -> Result<Category> {
    let category = self.api.update_category(id, patch).await?;
    self.applied(Mutation::UpdateCategory { id });
    Ok(category)
  }

  pub async fn delete_category(&self, id: Uuid) -> Result<Category> {
    let category = self.api.delete_category(id).await?;
    self.applied(Mutation::DeleteCategory { id });
    Ok(category)
  }

  pub async fn create_entry(&self, input: &NewEntry) -> Result<Entry> {
    let entry = self.api.create_entry(input).await?;
    self.applied(Mutation::CreateEntry { category_id: entry.category_id });
    Ok(entry)
  }

  pub async fn update_entry(&self, id: Uuid, patch: &EntryPatch) -> Result<Entry> {
    let entry = self.api.update_entry(id, patch).await?;
    self.applied(Mutation::UpdateEntry { id, category_id: patch.category_id.flatten() });
    Ok(entry)
  }

  pub async fn delete_entry(&self, id: Uuid) -> Result<Entry> {
    let entry = self.api.delete_entry(id).await?;
    self.applied(Mutation::DeleteEntry { id });
    Ok(entry)
  }
}
