//! Metacognitive confidence scoring.
//!
//! Each recall result carries a confidence estimate blending retrievability,
//! the normalized hybrid match score, and raw strength. Contradicted entries
//! have their confidence halved — they are still returned, but flagged as
//! superseded knowledge.

use crate::memory::forgetting::retrievability;
use crate::memory::types::{ConfidenceLabel, MemoryEntry};

/// Confidence `c = clamp01(0.4*R + 0.4*s_match + 0.2*tanh(r1 + r2))`,
/// halved when the entry is contradicted.
pub fn confidence_score(entry: &MemoryEntry, match_score: f64, now: f64) -> f64 {
    let r = retrievability(entry, now);
    let strength = (entry.working_strength + entry.core_strength).tanh();
    let mut c = 0.4 * r + 0.4 * match_score.clamp(0.0, 1.0) + 0.2 * strength;
    if entry.contradicted_by.is_some() {
        c /= 2.0;
    }
    c.clamp(0.0, 1.0)
}

/// Band a numeric confidence.
pub fn confidence_label(confidence: f64) -> ConfidenceLabel {
    if confidence >= 0.85 {
        ConfidenceLabel::Certain
    } else if confidence >= 0.6 {
        ConfidenceLabel::Likely
    } else if confidence >= 0.3 {
        ConfidenceLabel::Uncertain
    } else {
        ConfidenceLabel::Vague
    }
}
