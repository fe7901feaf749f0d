//! Storage module for the crawl frontier
//!
//! This module handles persistence of discovered identifiers, including:
//! - SQLite database initialization and schema management
//! - Idempotent merging of newly discovered identifiers
//! - Random sampling of seeds for workers
//! - An in-memory reference backend

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryFrontier;
pub use sqlite::SqliteFrontier;
pub use traits::{FrontierStore, StoreError, StoreResult};

use std::path::Path;

/// Creates the SQLite frontier at `path`
///
/// The database is opened by the first successful `ensure_ready` call.
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
pub fn open_frontier(path: &Path) -> SqliteFrontier {
    SqliteFrontier::new(path)
}
