//! JSON REST API for Tally.
//!
//! Exposes an axum [`Router`] backed by any [`tally_core::store::CatalogStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/v1", tally_api::api_router(store.clone()))
//! ```

pub mod categories;
pub mod entries;
pub mod error;
pub mod extract;

use std::sync::Arc;

use axum::{Router, routing::get};
use tally_core::store::CatalogStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: CatalogStore + 'static,
{
  Router::new()
    // Categories
    .route("/category", get(categories::list::<S>).post(categories::create::<S>))
    .route("/category/{id}", get(categories::get_one::<S>).put(categories::update::<S>))
    // Entries
    .route("/entry", get(entries::list::<S>).post(entries::create::<S>))
    .route(
      "/entry/{id}",
      get(entries::get_one::<S>)
        .put(entries::update::<S>)
        .delete(entries::delete::<S>),
    )
    .with_state(store)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use serde_json::{Value, json};
  use tally_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  async fn app() -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    api_router(Arc::new(store))
  }

  async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let req = builder
      .body(body.map(|b| Body::from(b.to_owned())).unwrap_or_else(Body::empty))
      .unwrap();
    let resp   = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes  = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value  = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  // ── Categories ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_category_returns_201() {
    let app = app().await;
    let (status, body) = send(&app, "POST", "/category", Some(r#"{"name":"Books"}"#)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Books");
    assert!(body["id"].is_string());
  }

  #[tokio::test]
  async fn create_category_with_unknown_field_returns_400() {
    let app = app().await;
    let (status, body) =
      send(&app, "POST", "/category", Some(r#"{"name":"Books","id":"x"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request body");
  }

  #[tokio::test]
  async fn malformed_json_returns_400_with_json_body() {
    let app = app().await;
    let (status, body) = send(&app, "POST", "/category", Some("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
  }

  #[tokio::test]
  async fn empty_name_returns_400() {
    let app = app().await;
    let (status, _) = send(&app, "POST", "/category", Some(r#"{"name":""}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn unparsable_id_returns_400() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/category/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid path parameter ID");
  }

  #[tokio::test]
  async fn category_has_no_delete_route() {
    let app = app().await;
    let (_, created) = send(&app, "POST", "/category", Some(r#"{"name":"Books"}"#)).await;
    let uri = format!("/category/{}", created["id"].as_str().unwrap());
    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
  }

  #[tokio::test]
  async fn put_unknown_category_returns_404() {
    let app = app().await;
    let uri = format!("/category/{}", uuid::Uuid::new_v4());
    let (status, body) = send(&app, "PUT", &uri, Some(r#"{"name":"x"}"#)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Category not found");
  }

  // ── Entries ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_entry_with_unknown_category_returns_400() {
    let app  = app().await;
    let body = json!({ "name": "Dune", "categoryId": uuid::Uuid::new_v4() }).to_string();
    let (status, body) = send(&app, "POST", "/entry", Some(&body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Unknown category"));
  }

  #[tokio::test]
  async fn invalid_query_parameter_returns_400() {
    let app = app().await;
    let (status, _) = send(&app, "GET", "/entry?categoryId=nope", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn only_literal_true_groups_entries() {
    let app = app().await;
    send(&app, "POST", "/entry", Some(r#"{"name":"Dune"}"#)).await;

    for uri in ["/entry?sortByCategory=1", "/entry?sortByCategory=", "/entry?sortByCategory=TRUE"] {
      let (status, body) = send(&app, "GET", uri, None).await;
      assert_eq!(status, StatusCode::OK, "{uri}");
      assert!(body["entries"].is_array(), "{uri}");
    }

    let (status, body) = send(&app, "GET", "/entry?sortByCategory=true", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entries"]["Uncategorized"][0]["name"], "Dune");
  }

  #[tokio::test]
  async fn empty_category_filter_means_unfiltered() {
    let app = app().await;
    send(&app, "POST", "/entry", Some(r#"{"name":"Dune"}"#)).await;
    send(&app, "POST", "/entry", Some(r#"{"name":"Emma"}"#)).await;

    let (status, body) = send(&app, "GET", "/entry?categoryId=", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["entries"].as_array().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn delete_unknown_entry_returns_404() {
    let app = app().await;
    let uri = format!("/entry/{}", uuid::Uuid::new_v4());
    let (status, body) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Entry not found");
  }

  #[tokio::test]
  async fn put_entry_with_empty_body_returns_400() {
    let app = app().await;
    let (_, created) = send(&app, "POST", "/entry", Some(r#"{"name":"Dune"}"#)).await;
    let uri = format!("/entry/{}", created["id"].as_str().unwrap());
    let (status, body) = send(&app, "PUT", &uri, Some("{}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No valid fields to update");
  }
}
