pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

/// Open (or create) the mnemo database at the given path, with schema
/// initialized and migrations applied.
///
/// The store file is owned by exactly one engine instance per path; writes
/// are serialized through this connection (WAL journal mode).
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    configure_connection(&conn)?;

    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;

    // Quick integrity check after schema init
    let integrity: String = conn.pragma_query_value(None, "quick_check", |row| row.get(0))?;
    if integrity != "ok" {
        anyhow::bail!("database integrity check failed: {integrity}");
    }

    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

/// Open an in-memory database with schema and migrations applied.
///
/// Non-persistent; useful for tests and throwaway sessions.
pub fn open_memory_database() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;
    Ok(conn)
}

/// WAL for concurrent readers, foreign keys for cascades, and a lock
/// timeout instead of immediate failure.
fn configure_connection(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "busy_timeout", "5000")?;
    Ok(())
}

/// Result of a full database health check.
#[derive(Debug, serde::Serialize)]
pub struct HealthReport {
    pub schema_version: u32,
    pub integrity_ok: bool,
    pub integrity_details: String,
    pub memory_count: i64,
    pub access_count: i64,
    pub graph_link_count: i64,
    pub hebbian_link_count: i64,
    pub embedding_count: i64,
    pub embedding_dim: Option<usize>,
}

/// Run a comprehensive health check on the database. Never mutates.
pub fn check_database_health(conn: &Connection) -> Result<HealthReport> {
    let schema_version =
        migrations::get_schema_version(conn).context("failed to read schema version")?;

    let integrity_details: String = conn
        .pragma_query_value(None, "integrity_check", |row| row.get(0))
        .context("failed to run integrity check")?;
    let integrity_ok = integrity_details == "ok";

    let count = |sql: &str| -> i64 {
        conn.query_row(sql, [], |row| row.get(0)).unwrap_or(0)
    };

    Ok(HealthReport {
        schema_version,
        integrity_ok,
        integrity_details,
        memory_count: count("SELECT COUNT(*) FROM memories"),
        access_count: count("SELECT COUNT(*) FROM access_log"),
        graph_link_count: count("SELECT COUNT(*) FROM graph_links"),
        hebbian_link_count: count("SELECT COUNT(*) FROM hebbian_links WHERE strength > 0"),
        embedding_count: count("SELECT COUNT(*) FROM memories WHERE embedding IS NOT NULL"),
        embedding_dim: migrations::get_embedding_dim(conn)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_report_on_fresh_db() {
        let conn = open_memory_database().unwrap();
        let report = check_database_health(&conn).unwrap();
        assert!(report.integrity_ok);
        assert_eq!(report.schema_version, migrations::CURRENT_SCHEMA_VERSION);
        assert_eq!(report.memory_count, 0);
        assert_eq!(report.embedding_dim, None);
    }
}
