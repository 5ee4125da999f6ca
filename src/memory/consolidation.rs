//! The consolidation cycle ("sleep replay").
//!
//! Executed on demand with a simulated-day step. Per non-pinned entry:
//! exponential decay of both strength traces, transfer from working to core
//! (scaled by importance), interleaved replay of a recency-bucketed sample,
//! layer transitions, then a global synaptic downscale and Hebbian link
//! decay. A failure on one entry never aborts the cycle — failures are
//! counted and reported.
//!
//! With `dt = 0` the cycle is bookkeeping-only: every strength-mutating step
//! is gated on a positive time step.

use anyhow::Result;
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::config::DynamicsConfig;
use crate::memory::forgetting::effective_strength;
use crate::memory::types::{MemoryEntry, MemoryLayer};
use crate::memory::{hebbian, store};

const DAY_SECS: f64 = 86_400.0;

/// Outcome of one consolidation cycle.
#[derive(Debug, Default, Serialize)]
pub struct ConsolidationReport {
    /// Entries the cycle visited.
    pub processed: usize,
    /// Entries whose per-entry transaction failed.
    pub failed: usize,
    /// Entries that received a replay boost.
    pub replayed: usize,
    /// Entries promoted into the core layer.
    pub promoted: usize,
    /// Entries demoted (working -> archive, or core -> working).
    pub demoted: usize,
    /// Hebbian links removed by decay.
    pub hebbian_links_removed: usize,
}

/// Run one full consolidation cycle over every entry.
pub fn run_cycle(
    conn: &mut Connection,
    dt_days: f64,
    config: &DynamicsConfig,
    hebbian_decay: Option<f64>,
    now: f64,
) -> Result<ConsolidationReport> {
    let mut report = ConsolidationReport::default();
    let entries = store::all_memories(conn)?;
    report.processed = entries.len();

    let replay_set: Vec<String> = if dt_days > 0.0 {
        select_replay_sample(&entries, config.replay_ratio, now)
    } else {
        Vec::new()
    };

    for entry in &entries {
        match consolidate_entry(conn, entry, dt_days, config, &replay_set, now) {
            Ok(outcome) => {
                if outcome.replayed {
                    report.replayed += 1;
                }
                if outcome.promoted {
                    report.promoted += 1;
                }
                if outcome.demoted {
                    report.demoted += 1;
                }
            }
            Err(e) => {
                report.failed += 1;
                tracing::warn!(id = %entry.id, error = %e, "consolidation failed for entry");
            }
        }
    }

    if dt_days > 0.0 {
        // Synaptic homeostasis: proportional downscale of all unpinned traces
        conn.execute(
            "UPDATE memories SET working_strength = working_strength * ?1, \
             core_strength = core_strength * ?1 WHERE pinned = 0",
            params![config.downscale_factor],
        )?;

        if let Some(factor) = hebbian_decay {
            report.hebbian_links_removed = hebbian::decay_links(conn, factor)?;
        }
    }

    tracing::info!(
        processed = report.processed,
        failed = report.failed,
        promoted = report.promoted,
        demoted = report.demoted,
        replayed = report.replayed,
        "consolidation cycle complete"
    );
    Ok(report)
}

#[derive(Default)]
struct EntryOutcome {
    replayed: bool,
    promoted: bool,
    demoted: bool,
}

/// Decay, transfer, replay, layer transition, and bookkeeping for one entry,
/// inside a single transaction.
fn consolidate_entry(
    conn: &mut Connection,
    entry: &MemoryEntry,
    dt_days: f64,
    config: &DynamicsConfig,
    replay_set: &[String],
    now: f64,
) -> Result<EntryOutcome> {
    let mut outcome = EntryOutcome::default();
    let mut updated = entry.clone();

    if dt_days > 0.0 && !entry.pinned {
        // Decay: hippocampal traces fade fast, neocortical slowly
        updated.working_strength *= (-config.mu1 * dt_days).exp();
        updated.core_strength *= (-config.mu2 * dt_days).exp();

        // Transfer: knowledge moves from working to core, gated by importance
        updated.core_strength +=
            config.alpha * updated.working_strength * dt_days * (1.0 + updated.importance);

        if replay_set.iter().any(|id| id == &entry.id) {
            updated.working_strength += config.replay_boost;
            outcome.replayed = true;
        }

        // Layer transition, monotone: an entry moves at most one way per cycle
        let e = effective_strength(&updated, now);
        if updated.core_strength >= config.promote_threshold
            && updated.layer != MemoryLayer::Core
        {
            updated.layer = MemoryLayer::Core;
            outcome.promoted = true;
        } else if updated.layer == MemoryLayer::Working && e < config.demote_threshold {
            updated.layer = MemoryLayer::Archive;
            outcome.demoted = true;
        } else if updated.layer == MemoryLayer::Core && e < config.archive_threshold {
            updated.layer = MemoryLayer::Working;
            outcome.demoted = true;
        }
    }

    updated.consolidation_count = entry.consolidation_count + 1;
    updated.last_consolidated = Some(now);

    let tx = conn.transaction()?;
    tx.execute(
        "UPDATE memories SET working_strength = ?1, core_strength = ?2, layer = ?3, \
         consolidation_count = ?4, last_consolidated = ?5 WHERE id = ?6",
        params![
            updated.working_strength,
            updated.core_strength,
            updated.layer.as_str(),
            updated.consolidation_count,
            updated.last_consolidated,
            updated.id,
        ],
    )?;
    tx.commit()?;
    Ok(outcome)
}

/// Interleaved replay sample, weighted by recency buckets: half the sample
/// from the last day, a third from the last week, the rest older. Within a
/// bucket the most recently accessed entries replay first, which preserves
/// the spacing effect without a randomness source.
fn select_replay_sample(entries: &[MemoryEntry], replay_ratio: f64, now: f64) -> Vec<String> {
    let eligible: Vec<&MemoryEntry> = entries.iter().filter(|e| !e.pinned).collect();
    let sample_size = ((eligible.len() as f64) * replay_ratio).ceil() as usize;
    if sample_size == 0 {
        return Vec::new();
    }

    let mut last_day: Vec<&MemoryEntry> = Vec::new();
    let mut last_week: Vec<&MemoryEntry> = Vec::new();
    let mut older: Vec<&MemoryEntry> = Vec::new();
    for entry in eligible {
        let age_days = (now - entry.last_access()) / DAY_SECS;
        if age_days <= 1.0 {
            last_day.push(entry);
        } else if age_days <= 7.0 {
            last_week.push(entry);
        } else {
            older.push(entry);
        }
    }
    for bucket in [&mut last_day, &mut last_week, &mut older] {
        bucket.sort_by(|a, b| {
            b.last_access()
                .partial_cmp(&a.last_access())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    let quotas = [
        (last_day, (sample_size as f64 * 0.5).ceil() as usize),
        (last_week, (sample_size as f64 * 0.3).ceil() as usize),
        (older, (sample_size as f64 * 0.2).ceil() as usize),
    ];

    let mut sample: Vec<String> = Vec::with_capacity(sample_size);
    let mut leftovers: Vec<&MemoryEntry> = Vec::new();
    for (bucket, quota) in quotas {
        for (i, entry) in bucket.into_iter().enumerate() {
            if i < quota && sample.len() < sample_size {
                sample.push(entry.id.clone());
            } else {
                leftovers.push(entry);
            }
        }
    }
    // Sparse buckets can leave the sample short; top up from the rest
    for entry in leftovers {
        if sample.len() >= sample_size {
            break;
        }
        sample.push(entry.id.clone());
    }
    sample
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::memory::store::{insert_memory, peek_memory, update_entry};
    use crate::memory::types::MemoryKind;

    fn test_db() -> Connection {
        db::open_memory_database().unwrap()
    }

    fn config() -> DynamicsConfig {
        DynamicsConfig::default()
    }

    fn add_at(conn: &mut Connection, content: &str, at: f64) -> String {
        insert_memory(conn, content, "", MemoryKind::Factual, 0.5, "", at).unwrap().id
    }

    #[test]
    fn decay_and_transfer_move_strength_toward_core() {
        let mut conn = test_db();
        let cfg = config();
        let now = 10.0 * DAY_SECS;
        let id = add_at(&mut conn, "fresh memory", now - DAY_SECS);

        run_cycle(&mut conn, 1.0, &cfg, None, now).unwrap();

        let e = peek_memory(&conn, &id).unwrap().unwrap();
        // r1 decayed from 1.0 then downscaled; r2 grew from 0 via transfer
        assert!(e.working_strength < 1.0);
        assert!(e.core_strength > 0.0);
        assert_eq!(e.consolidation_count, 1);
        assert!(e.last_consolidated.is_some());
    }

    #[test]
    fn zero_dt_is_bookkeeping_only() {
        let mut conn = test_db();
        let cfg = config();
        let id = add_at(&mut conn, "untouched", 1000.0);

        let before = peek_memory(&conn, &id).unwrap().unwrap();
        run_cycle(&mut conn, 0.0, &cfg, Some(0.95), 2000.0).unwrap();
        let after = peek_memory(&conn, &id).unwrap().unwrap();

        assert_eq!(before.working_strength, after.working_strength);
        assert_eq!(before.core_strength, after.core_strength);
        assert_eq!(before.layer, after.layer);
        assert_eq!(after.consolidation_count, 1);
        assert!(after.last_consolidated.is_some());
    }

    #[test]
    fn pinned_entries_are_invariant_up_to_bookkeeping() {
        let mut conn = test_db();
        let cfg = config();
        let id = add_at(&mut conn, "pinned forever", 1000.0);
        let mut e = peek_memory(&conn, &id).unwrap().unwrap();
        e.pinned = true;
        e.working_strength = 0.7;
        e.core_strength = 0.4;
        update_entry(&conn, &e).unwrap();

        for _ in 0..10 {
            run_cycle(&mut conn, 3.0, &cfg, Some(0.95), 31.0 * DAY_SECS).unwrap();
        }

        let after = peek_memory(&conn, &id).unwrap().unwrap();
        assert_eq!(after.working_strength, 0.7);
        assert_eq!(after.core_strength, 0.4);
        assert_eq!(after.layer, MemoryLayer::Working);
        assert_eq!(after.consolidation_count, 10);
    }

    #[test]
    fn strong_core_trace_promotes_to_core_layer() {
        let mut conn = test_db();
        let cfg = config();
        let now = 2.0 * DAY_SECS;
        let id = add_at(&mut conn, "promote me", now - 1000.0);
        let mut e = peek_memory(&conn, &id).unwrap().unwrap();
        e.core_strength = cfg.promote_threshold + 0.2;
        update_entry(&conn, &e).unwrap();

        let report = run_cycle(&mut conn, 1.0, &cfg, None, now).unwrap();
        assert_eq!(report.promoted, 1);
        assert_eq!(report.demoted, 0);

        let after = peek_memory(&conn, &id).unwrap().unwrap();
        assert_eq!(after.layer, MemoryLayer::Core);
    }

    #[test]
    fn weak_working_entry_demotes_to_archive() {
        let mut conn = test_db();
        let cfg = config();
        // Last accessed long ago: retrievability near zero
        let id = add_at(&mut conn, "fading out", 0.0);
        let mut e = peek_memory(&conn, &id).unwrap().unwrap();
        e.working_strength = 0.01;
        update_entry(&conn, &e).unwrap();

        let report = run_cycle(&mut conn, 1.0, &cfg, None, 300.0 * DAY_SECS).unwrap();
        assert_eq!(report.demoted, 1);

        let after = peek_memory(&conn, &id).unwrap().unwrap();
        assert_eq!(after.layer, MemoryLayer::Archive);
    }

    #[test]
    fn no_entry_both_promotes_and_demotes_in_one_cycle() {
        let mut conn = test_db();
        let cfg = config();
        let now = 2.0 * DAY_SECS;
        // Strong core trace but ancient access: promotion wins, demotion skipped
        let id = add_at(&mut conn, "both ways", 1000.0);
        let mut e = peek_memory(&conn, &id).unwrap().unwrap();
        e.core_strength = cfg.promote_threshold + 0.5;
        update_entry(&conn, &e).unwrap();

        let report = run_cycle(&mut conn, 1.0, &cfg, None, now).unwrap();
        assert_eq!(report.promoted, 1);
        assert_eq!(report.demoted, 0);
        let after = peek_memory(&conn, &id).unwrap().unwrap();
        assert_eq!(after.layer, MemoryLayer::Core);
    }

    #[test]
    fn replay_boosts_a_recency_weighted_sample() {
        let mut conn = test_db();
        let mut cfg = config();
        cfg.replay_ratio = 1.0; // everything replays
        let now = 5.0 * DAY_SECS;
        let id = add_at(&mut conn, "replayed", now - 1000.0);

        let report = run_cycle(&mut conn, 1.0, &cfg, None, now).unwrap();
        assert_eq!(report.replayed, 1);

        let e = peek_memory(&conn, &id).unwrap().unwrap();
        // decay then transfer then boost then downscale, must exceed plain decay
        let plain = 1.0 * (-cfg.mu1).exp() * cfg.downscale_factor;
        assert!(e.working_strength > plain);
    }

    #[test]
    fn downscale_applies_to_unpinned_only() {
        let mut conn = test_db();
        let mut cfg = config();
        cfg.replay_ratio = 0.0;
        let now = DAY_SECS;
        let plain = add_at(&mut conn, "scaled", now - 1000.0);
        let pinned = add_at(&mut conn, "not scaled", now - 1000.0);
        let mut e = peek_memory(&conn, &pinned).unwrap().unwrap();
        e.pinned = true;
        update_entry(&conn, &e).unwrap();

        run_cycle(&mut conn, 1.0, &cfg, None, now).unwrap();

        let scaled = peek_memory(&conn, &plain).unwrap().unwrap();
        let expected = 1.0 * (-cfg.mu1).exp() * cfg.downscale_factor;
        assert!((scaled.working_strength - expected).abs() < 1e-9);

        let unscaled = peek_memory(&conn, &pinned).unwrap().unwrap();
        assert_eq!(unscaled.working_strength, 1.0);
    }

    #[test]
    fn hebbian_links_decay_with_the_cycle() {
        let mut conn = test_db();
        let cfg = config();
        let heb = crate::config::HebbianConfig::default();
        let a = add_at(&mut conn, "alpha", 1000.0);
        let b = add_at(&mut conn, "beta", 1000.0);
        for _ in 0..3 {
            hebbian::record_coactivation(&mut conn, &[a.clone(), b.clone()], &heb, 1000.0).unwrap();
        }

        run_cycle(&mut conn, 1.0, &cfg, Some(0.95), DAY_SECS).unwrap();
        let s = hebbian::link_strength(&conn, &a, &b).unwrap();
        assert!((s - 0.95).abs() < 1e-9);
    }

    #[test]
    fn replay_sample_respects_ratio_and_buckets() {
        let now = 30.0 * DAY_SECS;
        let mut entries = Vec::new();
        for i in 0..10 {
            let at = if i < 5 { now - 1000.0 } else { now - 20.0 * DAY_SECS };
            entries.push(MemoryEntry {
                id: format!("m{i}"),
                content: "x".to_string(),
                summary: String::new(),
                kind: MemoryKind::Factual,
                layer: MemoryLayer::Working,
                created_at: at,
                access_times: vec![at],
                working_strength: 1.0,
                core_strength: 0.0,
                importance: 0.5,
                pinned: false,
                consolidation_count: 0,
                last_consolidated: None,
                source: String::new(),
                contradicts: None,
                contradicted_by: None,
                embedding: None,
            });
        }

        let sample = select_replay_sample(&entries, 0.4, now);
        assert_eq!(sample.len(), 4);
        // Recent bucket dominates the sample
        let recent_count = sample.iter().filter(|id| {
            entries.iter().any(|e| &e.id == *id && e.last_access() > now - DAY_SECS)
        }).count();
        assert!(recent_count >= 2);
    }
}
