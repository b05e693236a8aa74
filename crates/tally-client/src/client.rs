//! Async HTTP client wrapping the Tally JSON API.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tally_core::{
  category::{Category, CategoryPatch, NewCategory},
  entry::{Entry, EntryPatch, EntryWithCategory, NewEntry},
  listing::{CategoryListing, EntryListing},
};
use uuid::Uuid;

/// Header carrying the shared API key.
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),

  /// The server answered with a non-success status. `message` is the
  /// `error` field of the JSON body when there was one.
  #[error("{method} {path} → {status}: {message}")]
  Status {
    method:  Method,
    path:    String,
    status:  StatusCode,
    message: String,
  },
}

impl Error {
  pub fn status(&self) -> Option<StatusCode> {
    match self {
      Self::Status { status, .. } => Some(*status),
      Self::Http(e) => e.status(),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Connection settings for the Tally API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  /// Server root, without the `/v1` prefix.
  pub base_url: String,
  pub api_key:  String,
}

#[derive(Deserialize)]
struct ErrorBody {
  error: String,
}

/// Async HTTP client for the Tally JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/v1{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn request(&self, method: Method, path: &str) -> RequestBuilder {
    self
      .client
      .request(method, self.url(path))
      .header(API_KEY_HEADER, &self.config.api_key)
  }

  async fn send<T: DeserializeOwned>(
    &self,
    method: Method,
    path: &str,
    build: impl FnOnce(RequestBuilder) -> RequestBuilder,
  ) -> Result<T> {
    tracing::debug!(%method, path, "request");
    let resp = build(self.request(method.clone(), path)).send().await?;

    let status = resp.status();
    if !status.is_success() {
      let message = match resp.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.canonical_reason().unwrap_or_default().to_owned(),
      };
      return Err(Error::Status { method, path: path.to_owned(), status, message });
    }
    Ok(resp.json().await?)
  }

  async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    self.send(method, path, |req| req.json(body)).await
  }

  // ── Categories ────────────────────────────────────────────────────────────

  /// `GET /v1/category`
  pub async fn list_categories(&self) -> Result<CategoryListing> {
    self.send(Method::GET, "/category", |req| req).await
  }

  /// `GET /v1/category/{id}`
  pub async fn get_category(&self, id: Uuid) -> Result<Category> {
    self.send(Method::GET, &format!("/category/{id}"), |req| req).await
  }

  /// `POST /v1/category`
  pub async fn create_category(&self, input: &NewCategory) -> Result<Category> {
    self.send_json(Method::POST, "/category", input).await
  }

  /// `PUT /v1/category/{id}`
  pub async fn update_category(&self, id: Uuid, patch: &CategoryPatch) -> Result<Category> {
    self.send_json(Method::PUT, &format!("/category/{id}"), patch).await
  }

  /// `DELETE /v1/category/{id}`. The server has no such route and answers
  /// 405; the call exists so cache invalidation covers it.
  pub async fn delete_category(&self, id: Uuid) -> Result<Category> {
    self.send(Method::DELETE, &format!("/category/{id}"), |req| req).await
  }

  // ── Entries ───────────────────────────────────────────────────────────────

  /// `GET /v1/entry`
  pub async fn list_entries(&self) -> Result<EntryListing> {
    self.send(Method::GET, "/entry", |req| req).await
  }

  /// `GET /v1/entry?sortByCategory=true`
  pub async fn list_entries_grouped(&self) -> Result<EntryListing> {
    self
      .send(Method::GET, "/entry", |req| req.query(&[("sortByCategory", "true")]))
      .await
  }

  /// `GET /v1/entry?categoryId=<id>`
  pub async fn list_entries_in_category(&self, category_id: Uuid) -> Result<EntryListing> {
    self
      .send(Method::GET, "/entry", |req| {
        req.query(&[("categoryId", category_id.to_string())])
      })
      .await
  }

  /// `GET /v1/entry/{id}`
  pub async fn get_entry(&self, id: Uuid) -> Result<EntryWithCategory> {
    self.send(Method::GET, &format!("/entry/{id}"), |req| req).await
  }

  /// `POST /v1/entry`
  pub async fn create_entry(&self, input: &NewEntry) -> Result<Entry> {
    self.send_json(Method::POST, "/entry", input).await
  }

  /// `PUT /v1/entry/{id}`
  pub async fn update_entry(&self, id: Uuid, patch: &EntryPatch) -> Result<Entry> {
    self.send_json(Method::PUT, &format!("/entry/{id}"), patch).await
  }

  /// `DELETE /v1/entry/{id}`
  pub async fn delete_entry(&self, id: Uuid) -> Result<Entry> {
    self.send(Method::DELETE, &format!("/entry/{id}"), |req| req).await
  }
}
