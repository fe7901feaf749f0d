//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the FrontierStore trait.

use crate::identifier::VideoId;
use crate::storage::schema::{initialize_schema, table_exists};
use crate::storage::traits::{FrontierStore, StoreError, StoreResult};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// SQLite-backed frontier
///
/// The connection is opened lazily by [`FrontierStore::ensure_ready`], so a
/// database that is not reachable yet (missing volume, locked file) is retried
/// by the supervisor instead of failing construction. All queries run on the
/// blocking thread pool behind one mutex, which serializes writes.
pub struct SqliteFrontier {
    /// `None` selects a private in-memory database
    path: Option<PathBuf>,
    conn: Arc<Mutex<Option<Connection>>>,
}

impl SqliteFrontier {
    /// Creates a frontier backed by the database file at `path`
    ///
    /// Nothing is opened until `ensure_ready` is called.
    pub fn new(path: &Path) -> Self {
        Self {
            path: Some(path.to_path_buf()),
            conn: Arc::new(Mutex::new(None)),
        }
    }

    /// Creates a frontier backed by a private in-memory database
    pub fn in_memory() -> Self {
        Self {
            path: None,
            conn: Arc::new(Mutex::new(None)),
        }
    }

    fn open_connection(path: Option<&Path>) -> StoreResult<Connection> {
        let conn = match path {
            Some(path) => {
                let conn = Connection::open(path)?;
                // Configure SQLite for concurrent readers and a single writer
                conn.execute_batch(
                    "
                    PRAGMA journal_mode = WAL;
                    PRAGMA synchronous = NORMAL;
                    PRAGMA busy_timeout = 5000;
                    PRAGMA temp_store = MEMORY;
                ",
                )?;
                conn
            }
            None => Connection::open_in_memory()?,
        };

        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(conn)
    }

    /// Runs `f` against the open connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StoreError::Database("connection mutex poisoned".to_string()))?;
            let conn = guard.as_mut().ok_or(StoreError::NotReady)?;
            f(conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl FrontierStore for SqliteFrontier {
    async fn ensure_ready(&self) -> StoreResult<()> {
        let path = self.path.clone();
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StoreError::Database("connection mutex poisoned".to_string()))?;

            if guard.is_none() {
                *guard = Some(Self::open_connection(path.as_deref())?);
            }

            let conn = guard.as_ref().ok_or(StoreError::NotReady)?;
            initialize_schema(conn)?;

            if !table_exists(conn)? {
                return Err(StoreError::Unavailable(
                    "video_ids table missing after schema creation".to_string(),
                ));
            }

            Ok(())
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    async fn sample(&self, n: usize) -> StoreResult<Vec<VideoId>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare("SELECT id FROM video_ids ORDER BY RANDOM() LIMIT ?1")?;
            let rows = stmt.query_map(params![n as i64], |row| row.get::<_, String>(0))?;

            let mut ids = Vec::with_capacity(n);
            for row in rows {
                let raw = row?;
                match raw.parse::<VideoId>() {
                    Ok(id) => ids.push(id),
                    Err(e) => tracing::warn!("Skipping malformed stored identifier {:?}: {}", raw, e),
                }
            }
            Ok(ids)
        })
        .await
    }

    async fn merge(&self, ids: &HashSet<VideoId>) -> StoreResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let owned: Vec<String> = ids.iter().map(|id| id.as_str().to_string()).collect();

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let mut inserted = 0;
            {
                let mut stmt = tx.prepare("INSERT OR IGNORE INTO video_ids (id) VALUES (?1)")?;
                for id in &owned {
                    inserted += stmt.execute(params![id])?;
                }
            }
            tx.commit()?;
            Ok(inserted)
        })
        .await
    }

    async fn count(&self) -> StoreResult<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM video_ids", [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
    }
}
