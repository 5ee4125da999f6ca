//! Ebbinghaus forgetting: retrievability, stability, and pruning.
//!
//! Retrievability decays exponentially with time since last access, with a
//! per-entry stability time-constant that grows with repeated retrieval
//! (spacing effect), consolidation, and importance. Effective strength —
//! the pruning and display quantity — is the strength sum discounted by
//! retrievability.

use anyhow::Result;
use rusqlite::Connection;

use crate::memory::store;
use crate::memory::types::MemoryEntry;

const DAY_SECS: f64 = 86_400.0;

/// Stability growth per consolidation cycle.
const BETA: f64 = 0.2;
/// Stability growth from importance.
const GAMMA: f64 = 0.5;
/// Stability growth from repeated access (log-bounded).
const DELTA: f64 = 0.1;

/// Retrievability time-constant in days.
///
/// `S = S_kind * (1 + beta*consolidations) * (1 + gamma*importance)
///    * (1 + delta*ln(1 + accesses))`
///
/// Monotone non-decreasing in consolidation count and access count, so a
/// memory that keeps being retrieved keeps getting more durable.
pub fn stability_days(entry: &MemoryEntry) -> f64 {
    let base = entry.kind.base_stability_days();
    let consolidation = 1.0 + BETA * f64::from(entry.consolidation_count);
    let importance = 1.0 + GAMMA * entry.importance;
    let access = 1.0 + DELTA * (1.0 + entry.access_times.len() as f64).ln();
    base * consolidation * importance * access
}

/// Retrievability `R = exp(-dt / S)` in (0, 1], with `dt` the days since the
/// last access.
pub fn retrievability(entry: &MemoryEntry, now: f64) -> f64 {
    let elapsed_days = ((now - entry.last_access()) / DAY_SECS).max(0.0);
    (-elapsed_days / stability_days(entry)).exp()
}

/// Effective strength `E = (r1 + r2) * R`.
pub fn effective_strength(entry: &MemoryEntry, now: f64) -> f64 {
    (entry.working_strength + entry.core_strength) * retrievability(entry, now)
}

/// Whether the pruning pass removes this entry.
///
/// Pinned entries and entries participating in a contradiction chain are
/// never pruned — the chain is the audit trail of corrections.
pub fn should_forget(entry: &MemoryEntry, threshold: f64, now: f64) -> bool {
    !entry.pinned
        && entry.contradicts.is_none()
        && entry.contradicted_by.is_none()
        && effective_strength(entry, now) < threshold
}

/// Delete every entry matching the prune predicate. Deletion cascades to the
/// access log, graph links, and Hebbian links. Returns the number removed.
pub fn prune_forgotten(conn: &Connection, threshold: f64, now: f64) -> Result<usize> {
    let entries = store::all_memories(conn)?;
    let mut removed = 0;
    for entry in &entries {
        if should_forget(entry, threshold, now) && store::delete_memory(conn, &entry.id)? {
            removed += 1;
        }
    }
    if removed > 0 {
        tracing::info!(removed, threshold, "pruned weak memories");
    }
    Ok(removed)
}
