//! Dopaminergic feedback: cue-phrase polarity detection and reward
//! application.
//!
//! Feedback text is classified against small positive/negative cue
//! dictionaries (injectable through [`crate::config::RewardConfig`]). A
//! confident signal adjusts the importance and working strength of the most
//! recently accessed memories — positive feedback makes them consolidate
//! faster, negative feedback suppresses them.

use anyhow::Result;
use rusqlite::{params, Connection};

use crate::config::RewardConfig;

/// Detected feedback polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Positive,
    Negative,
    Neutral,
}

/// Classify feedback text. Returns the polarity and a magnitude in [0, 1]
/// that grows with the number of matched cues (1 cue = 0.5, 2 = 0.75,
/// 3+ = 1.0). Matching is case-insensitive substring over whole phrases.
pub fn detect_feedback(text: &str, config: &RewardConfig) -> (Polarity, f64) {
    let lowered = text.to_lowercase();
    let positive = config
        .positive_cues
        .iter()
        .filter(|cue| lowered.contains(cue.to_lowercase().as_str()))
        .count();
    let negative = config
        .negative_cues
        .iter()
        .filter(|cue| lowered.contains(cue.to_lowercase().as_str()))
        .count();

    if positive == negative {
        return (Polarity::Neutral, 0.0);
    }
    let (polarity, hits) = if positive > negative {
        (Polarity::Positive, positive - negative)
    } else {
        (Polarity::Negative, negative - positive)
    };
    let magnitude = 1.0 - 0.5f64.powi(hits as i32);
    (polarity, magnitude)
}

/// Apply a reward signal to the `recent_n` most recently accessed distinct
/// memories: `importance` and `r1` shift by `±reward_magnitude * magnitude`.
/// Importance stays in [0, 1], working strength never drops below zero.
/// Returns the number of memories affected.
pub fn apply_reward(
    conn: &mut Connection,
    polarity: Polarity,
    magnitude: f64,
    config: &RewardConfig,
) -> Result<usize> {
    if polarity == Polarity::Neutral || magnitude <= 0.0 {
        return Ok(0);
    }

    let recent_ids = recently_accessed(conn, config.recent_n)?;
    let delta = match polarity {
        Polarity::Positive => config.magnitude * magnitude,
        Polarity::Negative => -config.magnitude * magnitude,
        Polarity::Neutral => unreachable!(),
    };

    let tx = conn.transaction()?;
    let mut affected = 0;
    for id in &recent_ids {
        let changed = tx.execute(
            "UPDATE memories SET \
             importance = MAX(0.0, MIN(1.0, importance + ?1)), \
             working_strength = MAX(0.0, working_strength + ?1) \
             WHERE id = ?2",
            params![delta, id],
        )?;
        affected += changed;
    }
    tx.commit()?;

    tracing::debug!(affected, delta, "applied reward signal");
    Ok(affected)
}

/// Distinct memory ids by most recent access, newest first.
fn recently_accessed(conn: &Connection, n: usize) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT memory_id FROM access_log GROUP BY memory_id \
         ORDER BY MAX(accessed_at) DESC LIMIT ?1",
    )?;
    let ids = stmt
        .query_map(params![n as i64], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}
