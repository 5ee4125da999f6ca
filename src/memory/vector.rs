//! Embedding vector storage and similarity search.
//!
//! Vectors live in a JSON-encoded column on the memories table, which keeps
//! the store file a plain portable SQLite database. Search is a linear scan
//! with cosine similarity — entirely adequate below ~100k entries. All
//! vectors in one store share a single dimension, recorded in `schema_meta`
//! on the first write and enforced afterwards.

use anyhow::{bail, Result};
use rusqlite::{params, Connection};

use crate::db::migrations::{get_embedding_dim, set_embedding_dim};
use crate::embedding::cosine_similarity;

/// Attach (or replace) the embedding for a memory.
///
/// The first vector written fixes the store's dimension; later writes with a
/// different dimension are a storage-integrity error.
pub fn set_embedding(conn: &Connection, memory_id: &str, embedding: &[f32]) -> Result<()> {
    if embedding.is_empty() {
        bail!("refusing to store an empty embedding for {memory_id}");
    }
    match get_embedding_dim(conn)? {
        None => set_embedding_dim(conn, embedding.len())?,
        Some(dim) if dim != embedding.len() => bail!(
            "embedding dimension mismatch: store uses {dim}, got {}",
            embedding.len()
        ),
        Some(_) => {}
    }

    let json = serde_json::to_string(embedding)?;
    let rows = conn.execute(
        "UPDATE memories SET embedding = ?1 WHERE id = ?2",
        params![json, memory_id],
    )?;
    if rows == 0 {
        bail!("memory not found: {memory_id}");
    }
    Ok(())
}

/// Cosine-similarity top-k over all entries that have a vector.
///
/// Returns (id, similarity) pairs, best first, with similarity at or above
/// `min_similarity`. Negative similarities are clamped to zero so the fused
/// score stays in [0, 1].
pub fn vector_search(
    conn: &Connection,
    query: &[f32],
    k: usize,
    min_similarity: f64,
) -> Result<Vec<(String, f64)>> {
    if let Some(dim) = get_embedding_dim(conn)? {
        if dim != query.len() {
            bail!(
                "query embedding dimension mismatch: store uses {dim}, got {}",
                query.len()
            );
        }
    }

    let mut stmt =
        conn.prepare("SELECT id, embedding FROM memories WHERE embedding IS NOT NULL")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut scored: Vec<(String, f64)> = Vec::new();
    for row in rows {
        let (id, json) = row?;
        let Ok(stored) = serde_json::from_str::<Vec<f32>>(&json) else {
            tracing::warn!(id, "skipping undecodable embedding");
            continue;
        };
        let sim = cosine_similarity(query, &stored).max(0.0);
        if sim >= min_similarity {
            scored.push((id, sim));
        }
    }

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);
    Ok(scored)
}

/// Count of entries carrying a vector.
pub fn embedding_count(conn: &Connection) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM memories WHERE embedding IS NOT NULL",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// (id, content) of entries still missing a vector — the backfill work list.
pub fn ids_missing_embedding(conn: &Connection) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare(
        "SELECT id, content FROM memories WHERE embedding IS NULL ORDER BY created_at",
    )?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
