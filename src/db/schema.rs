//! SQL DDL for all mnemo tables.
//!
//! Defines the `memories`, `access_log`, `graph_links`, `hebbian_links`,
//! `memories_fts` (FTS5), and `schema_meta` tables. The FTS index mirrors
//! `memories.content` + `memories.summary` and is kept current by triggers.
//! All DDL uses `IF NOT EXISTS` for idempotent initialization.

use rusqlite::Connection;

/// Schema DDL for the core tables.
///
/// The `contradicts`, `contradicted_by`, and `embedding` columns are NOT part
/// of the base schema — they are added by forward migrations, which is the
/// only upgrade mechanism (additive columns only).
const SCHEMA_SQL: &str = r#"
-- Core memory storage
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    summary TEXT NOT NULL DEFAULT '',
    kind TEXT NOT NULL CHECK(kind IN ('factual','episodic','relational','emotional','procedural','opinion')),
    layer TEXT NOT NULL DEFAULT 'working' CHECK(layer IN ('core','working','archive')),
    created_at REAL NOT NULL,
    working_strength REAL NOT NULL DEFAULT 1.0 CHECK(working_strength >= 0.0),
    core_strength REAL NOT NULL DEFAULT 0.0 CHECK(core_strength >= 0.0),
    importance REAL NOT NULL DEFAULT 0.3 CHECK(importance >= 0.0 AND importance <= 1.0),
    pinned INTEGER NOT NULL DEFAULT 0,
    consolidation_count INTEGER NOT NULL DEFAULT 0,
    last_consolidated REAL,
    source TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_memories_kind ON memories(kind);
CREATE INDEX IF NOT EXISTS idx_memories_layer ON memories(layer);
CREATE INDEX IF NOT EXISTS idx_memories_created ON memories(created_at);

-- Append-only access history (the single source of recency)
CREATE TABLE IF NOT EXISTS access_log (
    memory_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    accessed_at REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_access_log_mid ON access_log(memory_id);

-- Memory -> entity bipartite graph
CREATE TABLE IF NOT EXISTS graph_links (
    memory_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    entity TEXT NOT NULL,
    relation TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_graph_links_mid ON graph_links(memory_id);
CREATE INDEX IF NOT EXISTS idx_graph_links_entity ON graph_links(entity);

-- Symmetric co-activation edges, canonical ordering source_id < target_id.
-- Rows with strength = 0 are pre-formation counters, not live links.
CREATE TABLE IF NOT EXISTS hebbian_links (
    source_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    target_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    strength REAL NOT NULL DEFAULT 0.0 CHECK(strength >= 0.0),
    coactivation_count INTEGER NOT NULL DEFAULT 0,
    created_at REAL NOT NULL,
    PRIMARY KEY (source_id, target_id),
    CHECK(source_id < target_id)
);

CREATE INDEX IF NOT EXISTS idx_hebbian_target ON hebbian_links(target_id);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Full-text index over content + summary, external-content mode.
const FTS_SQL: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS memories_fts USING fts5(
    content,
    summary,
    content='memories',
    content_rowid='rowid'
);
"#;

/// Triggers keep the FTS index consistent with the memories table.
const FTS_TRIGGERS_SQL: &str = r#"
CREATE TRIGGER IF NOT EXISTS memories_ai AFTER INSERT ON memories BEGIN
    INSERT INTO memories_fts(rowid, content, summary)
    VALUES (new.rowid, new.content, new.summary);
END;

CREATE TRIGGER IF NOT EXISTS memories_ad AFTER DELETE ON memories BEGIN
    INSERT INTO memories_fts(memories_fts, rowid, content, summary)
    VALUES ('delete', old.rowid, old.content, old.summary);
END;

CREATE TRIGGER IF NOT EXISTS memories_au AFTER UPDATE ON memories BEGIN
    INSERT INTO memories_fts(memories_fts, rowid, content, summary)
    VALUES ('delete', old.rowid, old.content, old.summary);
    INSERT INTO memories_fts(rowid, content, summary)
    VALUES (new.rowid, new.content, new.summary);
END;
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute_batch(FTS_SQL)?;
    conn.execute_batch(FTS_TRIGGERS_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"memories".to_string()));
        assert!(tables.contains(&"access_log".to_string()));
        assert!(tables.contains(&"graph_links".to_string()));
        assert!(tables.contains(&"hebbian_links".to_string()));
        assert!(tables.contains(&"schema_meta".to_string()));
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap(); // second call should not error
    }

    #[test]
    fn fts_triggers_mirror_inserts_and_deletes() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        conn.execute(
            "INSERT INTO memories (id, content, summary, kind, layer, created_at) \
             VALUES ('m1', 'the quantum computer hums', '', 'factual', 'working', 1.0)",
            [],
        )
        .unwrap();

        let hits: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM memories_fts WHERE memories_fts MATCH 'quantum'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(hits, 1);

        conn.execute("DELETE FROM memories WHERE id = 'm1'", []).unwrap();
        let hits: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM memories_fts WHERE memories_fts MATCH 'quantum'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(hits, 0);
    }

    #[test]
    fn hebbian_canonical_ordering_enforced() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        conn.execute(
            "INSERT INTO memories (id, content, kind, layer, created_at) VALUES ('a', 'x', 'factual', 'working', 1.0)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO memories (id, content, kind, layer, created_at) VALUES ('b', 'y', 'factual', 'working', 1.0)",
            [],
        )
        .unwrap();

        // Reversed ordering violates the CHECK constraint
        let err = conn.execute(
            "INSERT INTO hebbian_links (source_id, target_id, strength, coactivation_count, created_at) \
             VALUES ('b', 'a', 1.0, 3, 1.0)",
            [],
        );
        assert!(err.is_err());

        conn.execute(
            "INSERT INTO hebbian_links (source_id, target_id, strength, coactivation_count, created_at) \
             VALUES ('a', 'b', 1.0, 3, 1.0)",
            [],
        )
        .unwrap();
    }
}
