//! Error type for `tally-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// An entry referenced a category id with no row behind it.
  #[error("unknown category: {0}")]
  UnknownCategory(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl tally_core::store::StoreError for Error {
  fn unknown_category(&self) -> Option<uuid::Uuid> {
    match self {
      Error::UnknownCategory(id) => Some(*id),
      _ => None,
    }
  }
}
