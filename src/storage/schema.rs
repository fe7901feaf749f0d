//! Database schema definitions
//!
//! This module contains the SQL schema for the frontier database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Every identifier ever discovered; the primary key gives set semantics
CREATE TABLE IF NOT EXISTS video_ids (
    id TEXT PRIMARY KEY NOT NULL,
    discovered_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Checks that the identifier table is present
pub fn table_exists(conn: &rusqlite::Connection) -> Result<bool, rusqlite::Error> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'video_ids'",
        [],
        |row| row.get(0),
    )?;
    Ok(count == 1)
}
