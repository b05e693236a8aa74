//! Client against a live server on an ephemeral port.

use reqwest::StatusCode;
use tally_core::{
  category::{CategoryPatch, NewCategory},
  entry::{EntryPatch, NewEntry},
};
use tally_server::AppState;
use tally_store_sqlite::SqliteStore;
use tokio::net::TcpListener;

use crate::{
  ApiClient, ApiConfig, CachedClient,
  cache::{Query, Tag, TagKind},
};

const KEY: &str = "test-key";

async fn serve() -> String {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let app = tally_server::router(AppState::new(store, KEY));
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
  format!("http://{addr}")
}

fn client(base_url: &str, api_key: &str) -> ApiClient {
  ApiClient::new(ApiConfig { base_url: base_url.to_owned(), api_key: api_key.to_owned() })
    .unwrap()
}

#[tokio::test]
async fn wrong_key_is_rejected_with_401() {
  let url = serve().await;
  let err = client(&url, "nope").list_categories().await.unwrap_err();
  assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
  assert!(err.to_string().contains("Unauthorized"));
}

#[tokio::test]
async fn server_error_message_is_surfaced() {
  let url = serve().await;
  let err = client(&url, KEY)
    .update_category(uuid::Uuid::new_v4(), &CategoryPatch { name: Some("x".into()) })
    .await
    .unwrap_err();
  assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
  assert!(err.to_string().contains("Category not found"));
}

#[tokio::test]
async fn reads_are_served_from_cache_until_invalidated() {
  let url = serve().await;
  let api = client(&url, KEY);
  let cached = CachedClient::new(api.clone());

  assert_eq!(cached.entries().await.unwrap().total, 0);
  assert!(cached.cache().contains(&Query::Entries));

  // Written behind the cache's back: still served stale.
  api.create_entry(&NewEntry::new("Dune")).await.unwrap();
  assert_eq!(cached.entries().await.unwrap().total, 0);

  // Written through the cache: the list is refetched.
  cached.create_entry(&NewEntry::new("Emma")).await.unwrap();
  assert!(!cached.cache().contains(&Query::Entries));
  assert_eq!(cached.entries().await.unwrap().total, 2);
}

#[tokio::test]
async fn renaming_a_category_refreshes_grouped_view() {
  let url = serve().await;
  let cached = CachedClient::new(client(&url, KEY));

  let books = cached.create_category(&NewCategory::new("Books")).await.unwrap();
  cached.create_entry(&NewEntry::new("Dune").in_category(books.id)).await.unwrap();

  let grouped = cached.entries_grouped().await.unwrap();
  let json = serde_json::to_value(&grouped.entries).unwrap();
  assert!(json.get("Books").is_some());

  cached
    .update_category(books.id, &CategoryPatch { name: Some("Novels".into()) })
    .await
    .unwrap();
  assert!(!cached.cache().contains(&Query::EntriesGrouped));

  let grouped = cached.entries_grouped().await.unwrap();
  let json = serde_json::to_value(&grouped.entries).unwrap();
  assert!(json.get("Books").is_none());
  assert_eq!(json["Novels"][0]["name"], "Dune");
}

#[tokio::test]
async fn moving_an_entry_evicts_the_target_partition() {
  let url = serve().await;
  let cached = CachedClient::new(client(&url, KEY));

  let a = cached.create_category(&NewCategory::new("A")).await.unwrap();
  let b = cached.create_category(&NewCategory::new("B")).await.unwrap();
  let entry = cached.create_entry(&NewEntry::new("Dune").in_category(a.id)).await.unwrap();

  assert_eq!(cached.entries_in_category(b.id).await.unwrap().total, 0);
  assert_eq!(cached.entry(entry.id).await.unwrap().entry.category_id, Some(a.id));

  let mut watch = cached.cache().watch(Tag::with_id(TagKind::EntryByCategory, b.id));
  let patch = EntryPatch { category_id: Some(Some(b.id)), ..Default::default() };
  cached.update_entry(entry.id, &patch).await.unwrap();

  let seen = watch.changed().await.unwrap();
  assert!(seen.evicted.contains(&Query::EntriesByCategoryId(b.id)));
  assert!(seen.evicted.contains(&Query::EntryById(entry.id)));
  assert_eq!(cached.entries_in_category(b.id).await.unwrap().total, 1);
}

#[tokio::test]
async fn failed_mutation_invalidates_nothing() {
  let url = serve().await;
  let cached = CachedClient::new(client(&url, KEY));

  let books = cached.create_category(&NewCategory::new("Books")).await.unwrap();
  cached.categories().await.unwrap();
  cached.category(books.id).await.unwrap();

  let err = cached.delete_category(books.id).await.unwrap_err();
  assert_eq!(err.status(), Some(StatusCode::METHOD_NOT_ALLOWED));
  assert!(cached.cache().contains(&Query::Categories));
  assert!(cached.cache().contains(&Query::CategoryById(books.id)));
}

#[tokio::test]
async fn deleting_an_entry_hides_it_from_lists() {
  let url = serve().await;
  let cached = CachedClient::new(client(&url, KEY));

  let entry = cached.create_entry(&NewEntry::new("Dune")).await.unwrap();
  assert_eq!(cached.entries().await.unwrap().entries.len(), 1);

  let gone = cached.delete_entry(entry.id).await.unwrap();
  assert!(!gone.active);

  let listing = cached.entries().await.unwrap();
  assert!(listing.entries.is_empty());
  assert_eq!(listing.total, 1);
}
