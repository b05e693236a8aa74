//! Handlers for `/category` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/category` | `{total, categories}`; each category carries `entryCount` |
//! | `GET`  | `/category/:id` | 404 if not found |
//! | `POST` | `/category` | Body: `{"name":"..."}`; returns 201 + stored category |
//! | `PUT`  | `/category/:id` | Body: any non-empty subset of `{"name"}` |
//!
//! There is no delete route.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tally_core::{
  category::{Category, CategoryPatch, NewCategory},
  listing::CategoryListing,
  store::CatalogStore,
};
use uuid::Uuid;

use crate::{
  error::ApiError,
  extract::{ApiJson, ApiPath},
};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /category`
pub async fn list<S>(State(store): State<Arc<S>>) -> Result<Json<CategoryListing>, ApiError>
where
  S: CatalogStore,
{
  let categories = store
    .list_categories_with_entry_counts()
    .await
    .map_err(ApiError::store)?;
  let total = store.count_categories().await.map_err(ApiError::store)?;
  Ok(Json(CategoryListing { total, categories }))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /category/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Category>, ApiError>
where
  S: CatalogStore,
{
  let category = store
    .get_category(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("Category not found".into()))?;
  Ok(Json(category))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /category` — returns 201 + the stored [`Category`].
pub async fn create<S>(
  State(store): State<Arc<S>>,
  ApiJson(body): ApiJson<NewCategory>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CatalogStore,
{
  body.validate()?;
  let category = store.create_category(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(category)))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /category/:id` — the id is never reassigned.
pub async fn update<S>(
  State(store): State<Arc<S>>,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(patch): ApiJson<CategoryPatch>,
) -> Result<Json<Category>, ApiError>
where
  S: CatalogStore,
{
  patch.validate()?;
  let category = store
    .update_category(id, patch)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("Category not found".into()))?;
  Ok(Json(category))
}
