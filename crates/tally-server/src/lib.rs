//! HTTP server for Tally.
//!
//! Composes the [`tally_api`] router with the API-key gate, request tracing
//! and a liveness probe, on top of any [`CatalogStore`].

pub mod auth;

use std::{path::{Path, PathBuf}, sync::Arc};

use axum::{Router, middleware, routing::get};
use serde::Deserialize;
use tally_core::store::CatalogStore;
use tower_http::trace::TraceLayer;

use auth::{ApiKey, require_api_key};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `TALLY_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  /// Shared secret expected in the `x-api-key` header.
  pub api_key:    String,
}

impl ServerConfig {
  /// Layer the optional TOML file at `path` under the environment, on top of
  /// built-in defaults. Fails if no API key ends up configured.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    Self::load_with_env(path, None)
  }

  /// As [`load`](Self::load), reading `TALLY_*` variables from `env` instead
  /// of the process environment when given. Values stay strings until
  /// deserialisation, so an `api_key` of `007` is kept verbatim.
  fn load_with_env(
    path: &Path,
    env: Option<config::Map<String, String>>,
  ) -> Result<Self, config::ConfigError> {
    let cfg: Self = config::Config::builder()
      .set_default("host", "127.0.0.1")?
      .set_default("port", 8080)?
      .set_default("store_path", "tally.db")?
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("TALLY").source(env))
      .build()?
      .try_deserialize()?;

    if cfg.api_key.is_empty() {
      return Err(config::ConfigError::Message("api_key must not be empty".into()));
    }
    Ok(cfg)
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Everything the router needs, built once at startup and passed in.
#[derive(Clone)]
pub struct AppState<S: CatalogStore> {
  pub store:   Arc<S>,
  pub api_key: Arc<ApiKey>,
}

impl<S: CatalogStore> AppState<S> {
  pub fn new(store: S, api_key: &str) -> Self {
    Self { store: Arc::new(store), api_key: Arc::new(ApiKey::new(api_key)) }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the top-level router: `/health` is open, everything under `/v1`
/// requires the API key.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: CatalogStore + 'static,
{
  let api = tally_api::api_router(state.store.clone())
    .layer(middleware::from_fn_with_state(state.api_key.clone(), require_api_key));

  Router::new()
    .route("/health", get(|| async { "ok" }))
    .nest("/v1", api)
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────
