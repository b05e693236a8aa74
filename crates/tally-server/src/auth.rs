//! The shared-secret gate in front of every API route.

use std::sync::Arc;

use axum::{
  extract::{Request, State},
  http::HeaderMap,
  middleware::Next,
  response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use tally_api::ApiError;

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// The configured secret, kept only as its SHA-256 digest. Comparing digests
/// means the time taken does not depend on how much of a guess was right.
#[derive(Clone)]
pub struct ApiKey {
  digest: [u8; 32],
}

impl ApiKey {
  pub fn new(secret: &str) -> Self { Self { digest: Sha256::digest(secret.as_bytes()).into() } }

  pub fn matches(&self, presented: &str) -> bool {
    let presented: [u8; 32] = Sha256::digest(presented.as_bytes()).into();
    presented == self.digest
  }
}

/// Check the `x-api-key` header against `key`.
pub fn verify_api_key(headers: &HeaderMap, key: &ApiKey) -> Result<(), ApiError> {
  let presented = headers
    .get(API_KEY_HEADER)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  if !key.matches(presented) {
    return Err(ApiError::Unauthorized);
  }
  Ok(())
}

/// Middleware: reject with 401 before the wrapped handler runs.
pub async fn require_api_key(
  State(key): State<Arc<ApiKey>>,
  req: Request,
  next: Next,
) -> Response {
  match verify_api_key(req.headers(), &key) {
    Ok(()) => next.run(req).await,
    Err(e) => {
      tracing::warn!(
        method = %req.method(),
        uri = %req.uri(),
        "rejected request without a valid API key"
      );
      e.into_response()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::HeaderValue;

  fn headers(value: Option<&'static str>) -> HeaderMap {
    let mut map = HeaderMap::new();
    if let Some(v) = value {
      map.insert(API_KEY_HEADER, HeaderValue::from_static(v));
    }
    map
  }

  #[test]
  fn correct_key() {
    let key = ApiKey::new("secret");
    assert!(verify_api_key(&headers(Some("secret")), &key).is_ok());
  }

  #[test]
  fn wrong_key() {
    let key = ApiKey::new("secret");
    assert!(matches!(
      verify_api_key(&headers(Some("secreT")), &key),
      Err(ApiError::Unauthorized)
    ));
  }

  #[test]
  fn missing_header() {
    let key = ApiKey::new("secret");
    assert!(matches!(verify_api_key(&headers(None), &key), Err(ApiError::Unauthorized)));
  }

  #[test]
  fn prefix_of_key_is_rejected() {
    let key = ApiKey::new("secret");
    assert!(!key.matches("secre"));
    assert!(!key.matches(""));
  }
}
