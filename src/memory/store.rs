//! Write and read path for memory rows and their access history.
//!
//! [`insert_memory`] runs inside a transaction: one `memories` row plus the
//! creation access-log row; the FTS5 index is kept consistent by triggers.
//! [`get_memory`] records an access (this is what makes retrieval itself
//! reinforcing); [`peek_memory`] is the side-effect-free variant used by
//! internal maintenance.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

use crate::memory::types::{MemoryEntry, MemoryKind, MemoryLayer};

/// Map a `memories` row to an entry. Access times are attached separately.
fn row_to_entry(row: &Row) -> rusqlite::Result<MemoryEntry> {
    let kind_str: String = row.get("kind")?;
    let layer_str: String = row.get("layer")?;
    let contradicts: Option<String> = row.get("contradicts")?;
    let contradicted_by: Option<String> = row.get("contradicted_by")?;
    let embedding_json: Option<String> = row.get("embedding")?;

    Ok(MemoryEntry {
        id: row.get("id")?,
        content: row.get("content")?,
        summary: row.get("summary")?,
        kind: kind_str.parse().unwrap_or(MemoryKind::Factual),
        layer: layer_str.parse().unwrap_or(MemoryLayer::Working),
        created_at: row.get("created_at")?,
        access_times: Vec::new(),
        working_strength: row.get("working_strength")?,
        core_strength: row.get("core_strength")?,
        importance: row.get("importance")?,
        pinned: row.get::<_, i64>("pinned")? != 0,
        consolidation_count: row.get::<_, i64>("consolidation_count")? as u32,
        last_consolidated: row.get("last_consolidated")?,
        source: row.get("source")?,
        contradicts: contradicts.filter(|s| !s.is_empty()),
        contradicted_by: contradicted_by.filter(|s| !s.is_empty()),
        embedding: embedding_json.and_then(|s| serde_json::from_str(&s).ok()),
    })
}

const SELECT_COLUMNS: &str = "id, content, summary, kind, layer, created_at, \
     working_strength, core_strength, importance, pinned, consolidation_count, \
     last_consolidated, source, contradicts, contradicted_by, embedding";

/// Insert a new memory with a fresh hippocampal trace (r1 = 1.0, r2 = 0.0)
/// in the working layer, and record the creation access.
///
/// Runs in a transaction so the row and its first access-log entry are
/// atomic. Returns the stored entry.
pub fn insert_memory(
    conn: &mut Connection,
    content: &str,
    summary: &str,
    kind: MemoryKind,
    importance: f64,
    source: &str,
    created_at: f64,
) -> Result<MemoryEntry> {
    let id = uuid::Uuid::now_v7().to_string();
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO memories (id, content, summary, kind, layer, created_at, \
         working_strength, core_strength, importance, pinned, consolidation_count, source) \
         VALUES (?1, ?2, ?3, ?4, 'working', ?5, 1.0, 0.0, ?6, 0, 0, ?7)",
        params![id, content, summary, kind.as_str(), created_at, importance, source],
    )?;
    tx.execute(
        "INSERT INTO access_log (memory_id, accessed_at) VALUES (?1, ?2)",
        params![id, created_at],
    )?;

    tx.commit()?;

    Ok(MemoryEntry {
        id,
        content: content.to_string(),
        summary: summary.to_string(),
        kind,
        layer: MemoryLayer::Working,
        created_at,
        access_times: vec![created_at],
        working_strength: 1.0,
        core_strength: 0.0,
        importance,
        pinned: false,
        consolidation_count: 0,
        last_consolidated: None,
        source: source.to_string(),
        contradicts: None,
        contradicted_by: None,
        embedding: None,
    })
}

/// Fetch a memory and record an access at `now`. Returns `None` if missing.
pub fn get_memory(conn: &Connection, id: &str, now: f64) -> Result<Option<MemoryEntry>> {
    let Some(mut entry) = peek_memory(conn, id)? else {
        return Ok(None);
    };
    record_access(conn, id, now)?;
    entry.access_times.push(now);
    Ok(Some(entry))
}

/// Fetch a memory without recording an access (internal maintenance path).
pub fn peek_memory(conn: &Connection, id: &str) -> Result<Option<MemoryEntry>> {
    let entry = conn
        .query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM memories WHERE id = ?1"),
            params![id],
            row_to_entry,
        )
        .optional()?;

    match entry {
        Some(mut entry) => {
            entry.access_times = access_times(conn, id)?;
            Ok(Some(entry))
        }
        None => Ok(None),
    }
}

/// All entries with their access histories attached.
pub fn all_memories(conn: &Connection) -> Result<Vec<MemoryEntry>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {SELECT_COLUMNS} FROM memories ORDER BY created_at"))?;
    let mut entries = stmt
        .query_map([], row_to_entry)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut all_accesses: HashMap<String, Vec<f64>> = HashMap::new();
    let mut stmt =
        conn.prepare("SELECT memory_id, accessed_at FROM access_log ORDER BY accessed_at")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
    })?;
    for row in rows {
        let (id, at) = row?;
        all_accesses.entry(id).or_default().push(at);
    }

    for entry in &mut entries {
        if let Some(times) = all_accesses.remove(&entry.id) {
            entry.access_times = times;
        }
    }
    Ok(entries)
}

/// Batch fetch by id, with access histories. Missing ids are skipped.
pub fn fetch_memories(conn: &Connection, ids: &[String]) -> Result<HashMap<String, MemoryEntry>> {
    let mut map = HashMap::with_capacity(ids.len());
    for id in ids {
        if let Some(entry) = peek_memory(conn, id)? {
            map.insert(id.clone(), entry);
        }
    }
    Ok(map)
}

/// Replace the mutable fields of an entry. Never touches the access log.
pub fn update_entry(conn: &Connection, entry: &MemoryEntry) -> Result<()> {
    let embedding_json = entry
        .embedding
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let rows = conn.execute(
        "UPDATE memories SET content = ?1, summary = ?2, kind = ?3, layer = ?4, \
         working_strength = ?5, core_strength = ?6, importance = ?7, pinned = ?8, \
         consolidation_count = ?9, last_consolidated = ?10, source = ?11, \
         contradicts = ?12, contradicted_by = ?13, embedding = ?14 \
         WHERE id = ?15",
        params![
            entry.content,
            entry.summary,
            entry.kind.as_str(),
            entry.layer.as_str(),
            entry.working_strength,
            entry.core_strength,
            entry.importance,
            entry.pinned as i64,
            entry.consolidation_count,
            entry.last_consolidated,
            entry.source,
            entry.contradicts,
            entry.contradicted_by,
            embedding_json,
            entry.id,
        ],
    )?;
    if rows == 0 {
        anyhow::bail!("memory not found: {}", entry.id);
    }
    Ok(())
}

/// Delete a memory. Cascades to access_log, graph_links, and hebbian_links
/// via foreign keys. Returns `true` if a row was removed.
pub fn delete_memory(conn: &Connection, id: &str) -> Result<bool> {
    let rows = conn.execute("DELETE FROM memories WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

/// Append an access-log row.
pub fn record_access(conn: &Connection, id: &str, at: f64) -> Result<()> {
    conn.execute(
        "INSERT INTO access_log (memory_id, accessed_at) VALUES (?1, ?2)",
        params![id, at],
    )?;
    Ok(())
}

/// Access timestamps for a memory, oldest first.
pub fn access_times(conn: &Connection, id: &str) -> Result<Vec<f64>> {
    let mut stmt = conn.prepare(
        "SELECT accessed_at FROM access_log WHERE memory_id = ?1 ORDER BY accessed_at",
    )?;
    let times = stmt
        .query_map(params![id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(times)
}

/// FTS5 BM25 keyword search over content + summary.
///
/// Returns (id, rank) pairs ordered best-first. FTS5 rank is negative
/// (more negative = better match).
pub fn search_fts(conn: &Connection, query: &str, limit: usize) -> Result<Vec<(String, f64)>> {
    let escaped = escape_fts_query(query);
    if escaped.is_empty() {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(
        "SELECT m.id, f.rank FROM memories_fts f \
         JOIN memories m ON m.rowid = f.rowid \
         WHERE memories_fts MATCH ?1 ORDER BY f.rank LIMIT ?2",
    )?;
    let results = stmt
        .query_map(params![escaped, limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(results)
}

/// Escape a user query for FTS5 MATCH syntax.
///
/// Wraps each whitespace-delimited word in double quotes and joins with OR so
/// any matching term qualifies a candidate (ranking still favors rows that
/// match more terms). Strips empty tokens.
fn escape_fts_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|word| {
            let clean: String = word.chars().filter(|c| c.is_alphanumeric()).collect();
            format!("\"{clean}\"")
        })
        .filter(|w| w != "\"\"")
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Export a self-contained snapshot of the database to `path`.
///
/// Uses the SQLite online backup API, which works for both file-backed and
/// in-memory stores and never blocks readers for long.
pub fn export_database(conn: &Connection, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut dst = Connection::open(path)
        .with_context(|| format!("failed to open export target {}", path.display()))?;
    let backup = rusqlite::backup::Backup::new(conn, &mut dst)?;
    backup.run_to_completion(64, std::time::Duration::from_millis(50), None)?;
    tracing::info!(path = %path.display(), "database exported");
    Ok(())
}
