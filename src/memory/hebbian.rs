//! Hebbian co-activation learning.
//!
//! Every retrieval that returns two or more memories together increments a
//! co-activation counter for each unordered pair. A link materializes once
//! the counter reaches the formation threshold, strengthens multiplicatively
//! on further co-activations up to a cap, and decays each consolidation
//! cycle. Pairs are stored once under canonical ordering (source < target),
//! which makes the link symmetric by construction.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

use crate::config::HebbianConfig;
use crate::memory::types::HebbianLink;

/// Strength below which a decaying link is removed.
const REMOVAL_FLOOR: f64 = 0.1;

/// Canonical ordering of a pair: (min, max).
fn canonical<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Record one co-activation event for every unordered pair in `ids`.
///
/// Self-loops are impossible (pairs are drawn from distinct positions of a
/// deduplicated list) and duplicate ids are ignored. Runs in one transaction.
pub fn record_coactivation(
    conn: &mut Connection,
    ids: &[String],
    config: &HebbianConfig,
    now: f64,
) -> Result<()> {
    let mut unique: Vec<&str> = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(&id.as_str()) {
            unique.push(id);
        }
    }
    if unique.len() < 2 {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for i in 0..unique.len() {
        for j in (i + 1)..unique.len() {
            let (source, target) = canonical(unique[i], unique[j]);
            coactivate_pair(&tx, source, target, config, now)?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// Bump one pair's counter; materialize or strengthen its link.
fn coactivate_pair(
    conn: &Connection,
    source: &str,
    target: &str,
    config: &HebbianConfig,
    now: f64,
) -> Result<()> {
    let existing: Option<(f64, u32)> = conn
        .query_row(
            "SELECT strength, coactivation_count FROM hebbian_links \
             WHERE source_id = ?1 AND target_id = ?2",
            params![source, target],
            |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as u32)),
        )
        .optional()?;

    match existing {
        None => {
            let count = 1u32;
            let strength = if count >= config.formation_threshold { 1.0 } else { 0.0 };
            conn.execute(
                "INSERT INTO hebbian_links (source_id, target_id, strength, coactivation_count, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![source, target, strength, count, now],
            )?;
        }
        Some((strength, count)) => {
            let count = count + 1;
            let strength = if strength <= 0.0 {
                // Counter phase: materialize at 1.0 once the threshold is met
                if count >= config.formation_threshold { 1.0 } else { 0.0 }
            } else {
                (strength * (1.0 + config.strengthen_rate)).min(config.max_strength)
            };
            conn.execute(
                "UPDATE hebbian_links SET strength = ?1, coactivation_count = ?2 \
                 WHERE source_id = ?3 AND target_id = ?4",
                params![strength, count, source, target],
            )?;
        }
    }
    Ok(())
}

/// Ids with a live (strength > 0) link to `id`. Symmetric:
/// `neighbors(a)` contains b exactly when `neighbors(b)` contains a.
pub fn neighbors(conn: &Connection, id: &str) -> Result<Vec<String>> {
    neighbors_with_strength(conn, id, 0.0).map(|links| links.into_iter().map(|(id, _)| id).collect())
}

/// Live neighbors of `id` with link strength strictly above `floor`.
pub fn neighbors_with_strength(
    conn: &Connection,
    id: &str,
    floor: f64,
) -> Result<Vec<(String, f64)>> {
    let mut stmt = conn.prepare(
        "SELECT CASE WHEN source_id = ?1 THEN target_id ELSE source_id END, strength \
         FROM hebbian_links \
         WHERE (source_id = ?1 OR target_id = ?1) AND strength > ?2",
    )?;
    let links = stmt
        .query_map(params![id, floor], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(links)
}

/// Strength of the link between two memories, 0.0 if none.
pub fn link_strength(conn: &Connection, a: &str, b: &str) -> Result<f64> {
    let (source, target) = canonical(a, b);
    let strength: Option<f64> = conn
        .query_row(
            "SELECT strength FROM hebbian_links WHERE source_id = ?1 AND target_id = ?2",
            params![source, target],
            |row| row.get(0),
        )
        .optional()?;
    Ok(strength.unwrap_or(0.0))
}

/// All live links, strongest first.
pub fn all_links(conn: &Connection) -> Result<Vec<HebbianLink>> {
    let mut stmt = conn.prepare(
        "SELECT source_id, target_id, strength, coactivation_count \
         FROM hebbian_links WHERE strength > 0 ORDER BY strength DESC",
    )?;
    let links = stmt
        .query_map([], |row| {
            Ok(HebbianLink {
                source_id: row.get(0)?,
                target_id: row.get(1)?,
                strength: row.get(2)?,
                coactivation_count: row.get::<_, i64>(3)? as u32,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(links)
}

/// Multiply every live link's strength by `factor`; remove links that fall
/// below the removal floor. Pre-formation counter rows are untouched.
/// Returns the number of links removed.
pub fn decay_links(conn: &Connection, factor: f64) -> Result<usize> {
    conn.execute(
        "UPDATE hebbian_links SET strength = strength * ?1 WHERE strength > 0",
        params![factor],
    )?;
    let removed = conn.execute(
        "DELETE FROM hebbian_links WHERE strength > 0 AND strength < ?1",
        params![REMOVAL_FLOOR],
    )?;
    Ok(removed)
}
