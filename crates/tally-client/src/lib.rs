//! Client side of Tally: a typed HTTP client for the `/v1` API and a
//! tag-invalidated query cache in front of it.

pub mod cache;
pub mod cached;
pub mod client;

pub use cached::CachedClient;
pub use client::{ApiClient, ApiConfig, Error, Result};

#[cfg(test)]
mod tests;
