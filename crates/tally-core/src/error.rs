//! Error types for `tally-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A payload failed a field-level check (e.g. an empty name).
  #[error("{0}")]
  Validation(String),

  /// A partial update carried no fields at all.
  #[error("No valid fields to update")]
  EmptyPatch,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
