use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;

use crate::memory::forgetting::effective_strength;
use crate::memory::types::{MemoryKind, MemoryLayer};
use crate::memory::{store, vector};

/// Per-kind aggregate.
#[derive(Debug, Serialize)]
pub struct KindStats {
    pub count: u64,
    pub avg_strength: f64,
    pub avg_importance: f64,
}

/// Response from the stats operation.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_memories: u64,
    pub by_kind: HashMap<String, KindStats>,
    pub by_layer: HashMap<String, u64>,
    pub pinned: u64,
    pub contradicted: u64,
    pub total_accesses: u64,
    pub hebbian_links: u64,
    pub embeddings: u64,
    pub graph_entities: u64,
}

/// Compute store-wide statistics. Never mutates.
pub fn memory_stats(conn: &Connection, now: f64) -> Result<StatsResponse> {
    let entries = store::all_memories(conn)?;

    let mut by_layer: HashMap<String, u64> = MemoryLayer::ALL
        .iter()
        .map(|l| (l.as_str().to_string(), 0))
        .collect();
    let mut pinned = 0u64;
    let mut contradicted = 0u64;

    struct Acc {
        count: u64,
        strength_sum: f64,
        importance_sum: f64,
    }
    let mut by_kind_acc: HashMap<MemoryKind, Acc> = HashMap::new();

    for entry in &entries {
        *by_layer.entry(entry.layer.as_str().to_string()).or_insert(0) += 1;
        if entry.pinned {
            pinned += 1;
        }
        if entry.contradicted_by.is_some() {
            contradicted += 1;
        }
        let acc = by_kind_acc.entry(entry.kind).or_insert(Acc {
            count: 0,
            strength_sum: 0.0,
            importance_sum: 0.0,
        });
        acc.count += 1;
        acc.strength_sum += effective_strength(entry, now);
        acc.importance_sum += entry.importance;
    }

    let mut by_kind: HashMap<String, KindStats> = HashMap::new();
    for kind in MemoryKind::ALL {
        let stats = match by_kind_acc.get(&kind) {
            Some(acc) => KindStats {
                count: acc.count,
                avg_strength: acc.strength_sum / acc.count as f64,
                avg_importance: acc.importance_sum / acc.count as f64,
            },
            None => KindStats {
                count: 0,
                avg_strength: 0.0,
                avg_importance: 0.0,
            },
        };
        by_kind.insert(kind.as_str().to_string(), stats);
    }

    let total_accesses: i64 =
        conn.query_row("SELECT COUNT(*) FROM access_log", [], |row| row.get(0))?;
    let hebbian_links: i64 = conn.query_row(
        "SELECT COUNT(*) FROM hebbian_links WHERE strength > 0",
        [],
        |row| row.get(0),
    )?;
    let graph_entities: i64 =
        conn.query_row("SELECT COUNT(DISTINCT entity) FROM graph_links", [], |row| {
            row.get(0)
        })?;

    Ok(StatsResponse {
        total_memories: entries.len() as u64,
        by_kind,
        by_layer,
        pinned,
        contradicted,
        total_accesses: total_accesses as u64,
        hebbian_links: hebbian_links as u64,
        embeddings: vector::embedding_count(conn)? as u64,
        graph_entities: graph_entities as u64,
    })
}
