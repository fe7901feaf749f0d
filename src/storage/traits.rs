//! Storage traits and error types
//!
//! This module defines the trait interface for frontier store backends and
//! associated error types.

use crate::identifier::VideoId;
use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store has not been initialized")]
    NotReady,

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Storage task failed: {0}")]
    Task(String),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// The persistent set of every identifier discovered so far
///
/// The frontier is both the crawl's task source and its result sink.
/// Implementations must give `merge` set semantics: inserting an identifier
/// that is already present is a no-op, never an error, and concurrent merges
/// from several workers must be safe in any order.
#[async_trait]
pub trait FrontierStore: Send + Sync {
    /// Makes one attempt to reach the store and create the identifier set
    /// if it is absent
    ///
    /// Idempotent. The supervisor calls this repeatedly, with a fixed delay,
    /// until it succeeds or the retry cap is exhausted.
    async fn ensure_ready(&self) -> StoreResult<()>;

    /// Returns up to `n` identifiers in random order
    ///
    /// An empty store yields an empty vector, not an error.
    async fn sample(&self, n: usize) -> StoreResult<Vec<VideoId>>;

    /// Inserts every identifier not already present
    ///
    /// # Returns
    ///
    /// The number of identifiers that were new to the store
    async fn merge(&self, ids: &HashSet<VideoId>) -> StoreResult<usize>;

    /// Total number of identifiers in the store
    async fn count(&self) -> StoreResult<u64>;
}
