//! SQLite schema definitions and migrations.

use rusqlite::Connection;

use crate::error::{StoreError, StoreResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema.
pub fn initialize_schema(conn: &Connection) -> StoreResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        create_schema_v1(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    }

    Ok(())
}

fn internal(message: String, err: rusqlite::Error) -> StoreError {
    StoreError::Internal {
        backend_name: "sqlite".to_string(),
        message,
        source: Some(Box::new(err)),
    }
}

/// Get the current schema version.
fn get_schema_version(conn: &Connection) -> StoreResult<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| internal(format!("Failed to create schema_version table: {}", e), e))?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .ok();

    Ok(version.unwrap_or(0))
}

/// Set the schema version.
fn set_schema_version(conn: &Connection, version: i32) -> StoreResult<()> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| internal(format!("Failed to clear schema_version: {}", e), e))?;

    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .map_err(|e| internal(format!("Failed to set schema_version: {}", e), e))?;

    Ok(())
}

fn create_schema_v1(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS records (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            data TEXT NOT NULL,
            PRIMARY KEY (collection, id)
        );",
    )
    .map_err(|e| internal(format!("Failed to create records table: {}", e), e))?;

    Ok(())
}
