//! Entity graph links.
//!
//! Memories reference arbitrary string entities supplied by the caller
//! (people, projects, places). The bipartite memory-entity graph backs exact
//! entity lookup and bounded breadth-first expansion during recall.

use anyhow::Result;
use rusqlite::{params, Connection};
use std::collections::HashSet;

/// Link a memory to an entity label with an optional relation label.
pub fn add_graph_link(conn: &Connection, memory_id: &str, entity: &str, relation: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO graph_links (memory_id, entity, relation) VALUES (?1, ?2, ?3)",
        params![memory_id, entity, relation],
    )?;
    Ok(())
}

/// All (entity, relation) pairs for a memory.
pub fn entities_for(conn: &Connection, memory_id: &str) -> Result<Vec<(String, String)>> {
    let mut stmt =
        conn.prepare("SELECT entity, relation FROM graph_links WHERE memory_id = ?1")?;
    let pairs = stmt
        .query_map(params![memory_id], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(pairs)
}

/// Ids of all memories linked to an entity (exact label match).
pub fn search_by_entity(conn: &Connection, entity: &str) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT DISTINCT memory_id FROM graph_links WHERE entity = ?1")?;
    let ids = stmt
        .query_map(params![entity], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

/// All distinct entity labels in the graph.
pub fn all_entities(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT DISTINCT entity FROM graph_links ORDER BY entity")?;
    let entities = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entities)
}

/// Entities reachable from `entity` within `hops` via shared memories,
/// excluding the start label. Breadth-first over the bipartite graph.
pub fn related_entities(conn: &Connection, entity: &str, hops: usize) -> Result<Vec<String>> {
    let mut visited: HashSet<String> = HashSet::from([entity.to_string()]);
    let mut frontier: HashSet<String> = HashSet::from([entity.to_string()]);

    for _ in 0..hops {
        if frontier.is_empty() {
            break;
        }

        // Memories linked to any frontier entity
        let mut memory_ids: HashSet<String> = HashSet::new();
        for label in &frontier {
            memory_ids.extend(search_by_entity(conn, label)?);
        }
        if memory_ids.is_empty() {
            break;
        }

        // Entities linked to those memories
        let mut next: HashSet<String> = HashSet::new();
        for memory_id in &memory_ids {
            for (label, _relation) in entities_for(conn, memory_id)? {
                if !visited.contains(&label) {
                    next.insert(label);
                }
            }
        }

        visited.extend(next.iter().cloned());
        frontier = next;
    }

    visited.remove(entity);
    let mut out: Vec<String> = visited.into_iter().collect();
    out.sort();
    Ok(out)
}
