#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Remote posts API (trait plus HTTP client)
pub mod api;

/// Signed-in session
pub mod auth;

/// Configuration options
pub mod config;

/// Error (common error types)
pub mod error;

/// Feed composition (posts interleaved with ads and date separators)
pub mod feed;

/// Paged reconciliation of remote pages into the local store
pub mod mediator;

/// Posts, attachments and paging keys
pub mod model;

/// Pagination driver with retry
pub mod pager;

/// Repository (optimistic writes and the newer-count poller)
pub mod repository;

/// SQLite-backed local store
pub mod store;

#[cfg(test)]
pub mod test_utils;

pub use error::{FeedError, Result};
