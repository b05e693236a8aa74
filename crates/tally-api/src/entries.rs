//! Handlers for `/entry` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/entry` | Optional `?categoryId=<id>` or `?sortByCategory=true` |
//! | `GET`    | `/entry/:id` | Entry joined with its category; 404 if absent or deleted |
//! | `POST`   | `/entry` | Body: [`NewEntry`]; returns 201 + stored entry |
//! | `PUT`    | `/entry/:id` | Body: any non-empty subset of [`NewEntry`]'s fields |
//! | `DELETE` | `/entry/:id` | Soft delete; returns the entry with `active: false` |

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Deserializer, de::Error as _};
use tally_core::{
  entry::{Entry, EntryPatch, EntryWithCategory, NewEntry, group_by_category_name},
  listing::{EntryItems, EntryListing},
  store::CatalogStore,
};
use uuid::Uuid;

use crate::{
  error::ApiError,
  extract::{ApiJson, ApiPath, ApiQuery},
};

fn not_found() -> ApiError { ApiError::NotFound("Entry not found".into()) }

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
  /// Return a mapping from category name to entries instead of a flat list.
  /// Only the literal `true` turns it on; any other value means off.
  #[serde(default, deserialize_with = "literal_true")]
  pub sort_by_category: bool,
  /// Restrict to one category. Takes precedence over `sortByCategory`. An
  /// empty value means no filter.
  #[serde(default, deserialize_with = "blank_as_none")]
  pub category_id:      Option<Uuid>,
}

fn literal_true<'de, D: Deserializer<'de>>(de: D) -> Result<bool, D::Error> {
  Ok(String::deserialize(de)? == "true")
}

fn blank_as_none<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Uuid>, D::Error> {
  let raw = String::deserialize(de)?;
  if raw.is_empty() {
    return Ok(None);
  }
  Uuid::parse_str(&raw).map(Some).map_err(D::Error::custom)
}

/// `GET /entry[?categoryId=<id>][&sortByCategory=true]`
///
/// `total` counts every row in the table, deleted ones included, unless the
/// list is filtered by category; then it is the length of the filtered list.
pub async fn list<S>(
  State(store): State<Arc<S>>,
  ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<EntryListing>, ApiError>
where
  S: CatalogStore,
{
  if let Some(category_id) = params.category_id {
    let entries = store
      .list_active_entries(Some(category_id))
      .await
      .map_err(ApiError::store)?;
    return Ok(Json(EntryListing {
      total:   entries.len() as u64,
      entries: EntryItems::Flat(entries),
    }));
  }

  let entries = store.list_active_entries(None).await.map_err(ApiError::store)?;
  let total = store.count_entries().await.map_err(ApiError::store)?;

  let entries = if params.sort_by_category {
    EntryItems::Grouped(group_by_category_name(entries))
  } else {
    EntryItems::Flat(entries)
  };
  Ok(Json(EntryListing { total, entries }))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /entry/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<EntryWithCategory>, ApiError>
where
  S: CatalogStore,
{
  let entry = store
    .find_active_entry_by_id(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(not_found)?;
  Ok(Json(entry))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /entry` — returns 201 + the stored [`Entry`].
pub async fn create<S>(
  State(store): State<Arc<S>>,
  ApiJson(body): ApiJson<NewEntry>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CatalogStore,
{
  body.validate()?;
  let entry = store.create_entry(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(entry)))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /entry/:id` — 404 for deleted entries as well as unknown ids.
pub async fn update<S>(
  State(store): State<Arc<S>>,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(patch): ApiJson<EntryPatch>,
) -> Result<Json<Entry>, ApiError>
where
  S: CatalogStore,
{
  patch.validate()?;
  let entry = store
    .update_entry(id, patch)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(not_found)?;
  Ok(Json(entry))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /entry/:id` — flips `active` off; the row is kept.
pub async fn delete<S>(
  State(store): State<Arc<S>>,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Entry>, ApiError>
where
  S: CatalogStore,
{
  let entry = store
    .deactivate_entry(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(not_found)?;
  Ok(Json(entry))
}
