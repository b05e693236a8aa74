//! Core types and trait definitions for the Tally catalog.
//!
//! No HTTP or database dependencies live here. All other crates depend on it.

pub mod category;
pub mod entry;
pub mod error;
pub mod listing;
pub mod store;

pub use error::{Error, Result};
