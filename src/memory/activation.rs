//! ACT-R retrieval activation.
//!
//! Three additive components decide what surfaces: base-level activation
//! (recency and frequency of access, power-law decay), spreading activation
//! from context keywords, and importance weighting. Contradicted entries pay
//! a fixed penalty; Hebbian neighbors of co-present candidates receive a
//! spreading bonus. All functions are pure and deterministic.

use crate::config::ScoringConfig;
use crate::memory::types::MemoryEntry;

/// Power-law decay exponent `d` (0.5 matches human forgetting data).
const BASE_LEVEL_DECAY: f64 = 0.5;

/// Guard against a zero interval when an entry is scored in the same instant
/// it was accessed.
const EPSILON_SECS: f64 = 1.0;

/// Base-level activation `B = ln(sum_k (t_now - t_k + eps)^-d)`.
///
/// Returns negative infinity for an empty access history — the entry is not
/// retrievable by this term alone.
pub fn base_level_activation(access_times: &[f64], now: f64) -> f64 {
    if access_times.is_empty() {
        return f64::NEG_INFINITY;
    }

    let sum: f64 = access_times
        .iter()
        .map(|&t| ((now - t).max(0.0) + EPSILON_SECS).powf(-BASE_LEVEL_DECAY))
        .sum();
    sum.ln()
}

/// Spreading activation: count of context keywords that appear as whole
/// words in the entry's content, case-insensitive, scaled by the spread
/// weight.
pub fn spreading_activation(entry: &MemoryEntry, context: &[String], spread_weight: f64) -> f64 {
    if context.is_empty() {
        return 0.0;
    }
    let words = super::tokenize(&entry.content);
    let matches = context
        .iter()
        .filter(|k| words.contains(&k.to_lowercase()))
        .count();
    spread_weight * matches as f64
}

/// Composite retrieval activation:
/// `A = B + C + I - P*1[contradicted] + H`.
///
/// `hebbian_bonus` is the summed strength of live links from this entry to
/// co-present candidates, accumulated by the retrieval pipeline.
pub fn retrieval_activation(
    entry: &MemoryEntry,
    context: &[String],
    now: f64,
    hebbian_bonus: f64,
    scoring: &ScoringConfig,
) -> f64 {
    let base = base_level_activation(&entry.access_times, now);
    if base == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }

    let spread = spreading_activation(entry, context, scoring.spread_weight);
    let importance = scoring.importance_weight * entry.importance;
    let penalty = if entry.contradicted_by.is_some() {
        scoring.contradiction_penalty
    } else {
        0.0
    };
    let hebbian = scoring.hebbian_weight * hebbian_bonus;

    base + spread + importance - penalty + hebbian
}
