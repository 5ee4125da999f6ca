//! Hybrid candidate retrieval and ranking.
//!
//! Pipeline: lexical BM25 + vector cosine candidates → adaptive-weight
//! fusion → graph/Hebbian expansion → filters → ACT-R activation scoring →
//! stable ranking. Returning a result list has two side effects: every
//! returned entry gets an access-log append (retrieval is reinforcing), and
//! the final list becomes a co-activation event for Hebbian learning.
//!
//! Candidates come only from actual matches and their expansion — a query
//! that matches nothing returns nothing, never random rows.

use anyhow::Result;
use rusqlite::Connection;
use std::collections::{HashMap, HashSet};

use crate::config::MnemoConfig;
use crate::memory::types::{MemoryEntry, MemoryKind, MemoryLayer, RecallResult};
use crate::memory::{activation, confidence, forgetting, graph, hebbian, store, vector};

/// A recall request, already resolved to text plus an optional query vector.
pub struct RecallQuery<'a> {
    pub text: &'a str,
    pub vector: Option<&'a [f32]>,
    pub context: &'a [String],
    pub kinds: Option<&'a [MemoryKind]>,
    pub min_confidence: f64,
    pub graph_expand: bool,
    pub limit: usize,
}

struct Candidate {
    /// Normalized fusion score in [0, 1]; 0 for expansion-only candidates.
    fusion: f64,
    /// Whether lexical or semantic search matched this entry directly.
    /// Archive entries are searchable but never pulled in by expansion.
    directly_matched: bool,
}

/// Run the full retrieval pipeline. See module docs for the stages.
pub fn recall(
    conn: &mut Connection,
    query: &RecallQuery,
    config: &MnemoConfig,
    now: f64,
) -> Result<Vec<RecallResult>> {
    // 1. Lexical channel: BM25, negated and max-normalized into [0, 1].
    let fts_hits = store::search_fts(conn, query.text, config.retrieval.fts_candidates)?;
    let fts_scores = normalize_bm25(&fts_hits);

    // 2. Semantic channel: cosine top-k when a query vector exists.
    let vec_hits = match query.vector {
        Some(v) => vector::vector_search(
            conn,
            v,
            config.retrieval.vector_candidates,
            config.retrieval.min_similarity,
        )?,
        None => Vec::new(),
    };

    if fts_scores.is_empty() && vec_hits.is_empty() {
        return Ok(Vec::new());
    }

    // 3. Fusion with adaptive weights from channel agreement.
    let (w_vec, w_fts) = adaptive_weights(&vec_hits, &fts_scores);
    let mut candidates: HashMap<String, Candidate> = HashMap::new();
    for (id, sim) in &vec_hits {
        candidates.insert(
            id.clone(),
            Candidate { fusion: w_vec * sim, directly_matched: true },
        );
    }
    for (id, fts) in &fts_scores {
        candidates
            .entry(id.clone())
            .and_modify(|c| c.fusion += w_fts * fts)
            .or_insert(Candidate { fusion: w_fts * fts, directly_matched: true });
    }

    // 4. Expand top candidates through the entity graph and Hebbian links.
    let mut hebbian_bonus: HashMap<String, f64> = HashMap::new();
    if query.graph_expand {
        expand_candidates(conn, &mut candidates, &mut hebbian_bonus, config)?;
    }

    // 5-6. Fetch, filter, score.
    let ids: Vec<String> = candidates.keys().cloned().collect();
    let entries = store::fetch_memories(conn, &ids)?;

    let mut scored: Vec<(MemoryEntry, f64, f64, f64)> = Vec::new();
    for (id, candidate) in &candidates {
        let Some(entry) = entries.get(id) else { continue };

        if let Some(kinds) = query.kinds {
            if !kinds.contains(&entry.kind) {
                continue;
            }
        }
        if entry.layer == MemoryLayer::Archive && !candidate.directly_matched {
            continue;
        }

        let bonus = hebbian_bonus.get(id).copied().unwrap_or(0.0);
        let act = activation::retrieval_activation(entry, query.context, now, bonus, &config.scoring);
        if act == f64::NEG_INFINITY {
            continue;
        }

        let conf = confidence::confidence_score(entry, candidate.fusion, now);
        if conf < query.min_confidence {
            continue;
        }

        scored.push((entry.clone(), act, conf, candidate.fusion));
    }

    // Stable ordering: activation, then recency, importance, id.
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                b.0.created_at
                    .partial_cmp(&a.0.created_at)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(
                b.0.importance
                    .partial_cmp(&a.0.importance)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(a.0.id.cmp(&b.0.id))
    });
    scored.truncate(query.limit);

    // 7. Record an access on every returned entry; retrieval is the only
    // path out of the archive layer.
    let returned_ids: Vec<String> = scored.iter().map(|(e, ..)| e.id.clone()).collect();
    for (entry, ..) in &mut scored {
        store::record_access(conn, &entry.id, now)?;
        entry.access_times.push(now);
        if entry.layer == MemoryLayer::Archive {
            revive_from_archive(conn, entry, config)?;
        }
    }

    // 8. The final ordered list is a co-activation event.
    if config.hebbian.enabled && returned_ids.len() >= 2 {
        hebbian::record_coactivation(conn, &returned_ids, &config.hebbian, now)?;
    }

    let results = scored
        .into_iter()
        .map(|(entry, act, conf, _fusion)| RecallResult {
            strength: forgetting::effective_strength(&entry, now),
            confidence: conf,
            confidence_label: confidence::confidence_label(conf),
            activation: act,
            age_days: entry.age_days(now),
            contradicted: entry.contradicted_by.is_some(),
            id: entry.id,
            content: entry.content,
            summary: entry.summary,
            kind: entry.kind,
            layer: entry.layer,
            importance: entry.importance,
            source: entry.source,
        })
        .collect();

    Ok(results)
}

/// FTS5 rank is negative (more negative = better). Negate and max-normalize
/// into [0, 1].
fn normalize_bm25(hits: &[(String, f64)]) -> Vec<(String, f64)> {
    let max = hits.iter().map(|(_, rank)| -rank).fold(0.0f64, f64::max);
    if max <= 0.0 {
        // Degenerate ranks (all zero): count any match as a full hit.
        return hits.iter().map(|(id, _)| (id.clone(), 1.0)).collect();
    }
    hits.iter().map(|(id, rank)| (id.clone(), (-rank / max).clamp(0.0, 1.0))).collect()
}

/// Pick fusion weights from the Jaccard overlap of the two channels'
/// candidate sets: high agreement trusts the semantic channel most.
fn adaptive_weights(vec_hits: &[(String, f64)], fts_hits: &[(String, f64)]) -> (f64, f64) {
    if vec_hits.is_empty() {
        return (0.0, 1.0);
    }
    if fts_hits.is_empty() {
        return (1.0, 0.0);
    }

    let vec_ids: HashSet<&str> = vec_hits.iter().map(|(id, _)| id.as_str()).collect();
    let fts_ids: HashSet<&str> = fts_hits.iter().map(|(id, _)| id.as_str()).collect();
    let intersection = vec_ids.intersection(&fts_ids).count();
    let union = vec_ids.union(&fts_ids).count();
    let overlap = intersection as f64 / union as f64;

    if overlap > 0.5 {
        (0.8, 0.2)
    } else if overlap > 0.2 {
        (0.6, 0.4)
    } else {
        (0.4, 0.6)
    }
}

/// Union in 1-hop entity co-members and Hebbian neighbors of the strongest
/// candidates, accumulating spreading bonuses for co-present neighbors.
fn expand_candidates(
    conn: &Connection,
    candidates: &mut HashMap<String, Candidate>,
    hebbian_bonus: &mut HashMap<String, f64>,
    config: &MnemoConfig,
) -> Result<()> {
    let mut seeds: Vec<(String, f64)> = candidates
        .iter()
        .map(|(id, c)| (id.clone(), c.fusion))
        .collect();
    seeds.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    seeds.truncate(config.retrieval.expansion_seeds);

    for (seed_id, _) in &seeds {
        // (a) entries sharing any of the seed's entity labels, one hop
        for (entity, _relation) in graph::entities_for(conn, seed_id)? {
            for member_id in graph::search_by_entity(conn, &entity)? {
                candidates
                    .entry(member_id)
                    .or_insert(Candidate { fusion: 0.0, directly_matched: false });
            }
        }

        // (b) Hebbian neighbors above the strength floor; each link also
        // contributes to the neighbor's spreading bonus
        if config.hebbian.enabled {
            for (neighbor_id, strength) in
                hebbian::neighbors_with_strength(conn, seed_id, config.scoring.hebbian_floor)?
            {
                *hebbian_bonus.entry(neighbor_id.clone()).or_insert(0.0) += strength;
                candidates
                    .entry(neighbor_id)
                    .or_insert(Candidate { fusion: 0.0, directly_matched: false });
            }
        }
    }
    Ok(())
}

/// Retrieval access is the only path from archive back to working: boost the
/// hippocampal trace and promote once it clears the threshold.
fn revive_from_archive(conn: &Connection, entry: &mut MemoryEntry, config: &MnemoConfig) -> Result<()> {
    entry.working_strength += config.dynamics.replay_boost;
    if entry.working_strength >= config.dynamics.promote_threshold {
        entry.layer = MemoryLayer::Working;
        tracing::debug!(id = %entry.id, "archive entry revived to working");
    }
    store::update_entry(conn, entry)?;
    Ok(())
}
