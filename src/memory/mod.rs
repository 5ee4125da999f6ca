//! Core memory engine — storage, scoring, retrieval, and lifecycle.
//!
//! The write/read path lives in [`store`], the entity graph in [`graph`],
//! co-activation learning in [`hebbian`], the pure scoring math in
//! [`activation`] and [`forgetting`], hybrid retrieval in [`search`], the
//! consolidation cycle in [`consolidation`], and feedback handling in
//! [`reward`]. Type definitions live in [`types`].

pub mod activation;
pub mod anomaly;
pub mod confidence;
pub mod consolidation;
pub mod forgetting;
pub mod graph;
pub mod hebbian;
pub mod reward;
pub mod search;
pub mod session;
pub mod stats;
pub mod store;
pub mod types;
pub mod vector;

use std::collections::HashSet;

/// Current wall-clock time as fractional epoch seconds.
pub(crate) fn now_secs() -> f64 {
    let now = chrono::Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_millis()) / 1000.0
}

/// Lowercased alphanumeric word set of a text. Shared by spreading
/// activation, reward cue matching, and the session cache.
pub(crate) fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_splits_on_punctuation_and_lowercases() {
        let tokens = tokenize("User works at Anvil-Corp, since 2024!");
        assert!(tokens.contains("user"));
        assert!(tokens.contains("anvil"));
        assert!(tokens.contains("corp"));
        assert!(tokens.contains("2024"));
        assert!(!tokens.contains(""));
    }

    #[test]
    fn now_secs_is_positive_and_monotone() {
        let a = now_secs();
        let b = now_secs();
        assert!(a > 1.0e9);
        assert!(b >= a);
    }
}
