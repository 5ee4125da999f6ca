//! Forward-only, additive schema migration framework.
//!
//! Tracks the schema version in `schema_meta` and runs sequential migrations
//! to bring the database up to [`CURRENT_SCHEMA_VERSION`]. Migrations only
//! ever add columns — stores stay portable between engines of the same major
//! version.

use rusqlite::Connection;

/// The schema version that the current build expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 3;

/// Get the current schema version from the database.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'schema_version'",
        [],
        |row| {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().unwrap_or(0))
        },
    )
}

/// Update the stored schema version.
fn update_schema_version(conn: &Connection, version: u32) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE schema_meta SET value = ?1 WHERE key = 'schema_version'",
        [version.to_string()],
    )?;
    Ok(())
}

/// Get the stored embedding dimension, if any vectors have been written.
pub fn get_embedding_dim(conn: &Connection) -> rusqlite::Result<Option<usize>> {
    match conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'embedding_dim'",
        [],
        |row| row.get::<_, String>(0),
    ) {
        Ok(val) => Ok(val.parse::<usize>().ok()),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Record the embedding dimension on first vector write. Mixed-dimension
/// stores are forbidden, so this is written once and only checked afterwards.
pub fn set_embedding_dim(conn: &Connection, dim: usize) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_meta (key, value) VALUES ('embedding_dim', ?1)",
        [dim.to_string()],
    )?;
    Ok(())
}

/// Run any pending forward-only migrations.
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    let mut version = get_schema_version(conn)?;
    tracing::debug!(schema_version = version, wanted = CURRENT_SCHEMA_VERSION, "checking migrations");

    while version < CURRENT_SCHEMA_VERSION {
        let next = version + 1;
        tracing::info!(from = version, to = next, "running migration");

        match next {
            2 => migrate_v1_to_v2(conn)?,
            3 => migrate_v2_to_v3(conn)?,
            _ => {
                tracing::error!(version = next, "unknown migration target");
                break;
            }
        }

        update_schema_version(conn, next)?;
        version = next;
    }

    Ok(())
}

/// Returns the set of column names on the memories table.
fn memory_columns(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("PRAGMA table_info(memories)")?;
    let cols = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(cols)
}

/// Migration v1 -> v2: add the contradiction link columns.
fn migrate_v1_to_v2(conn: &Connection) -> rusqlite::Result<()> {
    let columns = memory_columns(conn)?;
    if !columns.iter().any(|c| c == "contradicts") {
        conn.execute("ALTER TABLE memories ADD COLUMN contradicts TEXT", [])?;
    }
    if !columns.iter().any(|c| c == "contradicted_by") {
        conn.execute("ALTER TABLE memories ADD COLUMN contradicted_by TEXT", [])?;
    }
    Ok(())
}

/// Migration v2 -> v3: add the JSON-encoded embedding vector column.
fn migrate_v2_to_v3(conn: &Connection) -> rusqlite::Result<()> {
    let columns = memory_columns(conn)?;
    if !columns.iter().any(|c| c == "embedding") {
        conn.execute("ALTER TABLE memories ADD COLUMN embedding TEXT", [])?;
    }
    Ok(())
}
