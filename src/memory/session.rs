//! Per-session working-memory cache.
//!
//! A small LRU (Miller bound of about seven slots) keyed by session id. When
//! a session's next query heavily overlaps the token set of its previous
//! result set, the previous results are replayed without a full retrieval
//! pass. Purely advisory: a cache hit returns a subset of entries a prior
//! real recall produced, so no invariant can be violated — only the access
//! log and Hebbian side effects are skipped.

use lru::LruCache;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use crate::config::SessionConfig;
use crate::memory::types::RecallResult;

struct Slot {
    /// Token set of the previous query plus its result contents.
    tokens: HashSet<String>,
    results: Vec<RecallResult>,
    stored_at: Instant,
}

/// Session-keyed working memory.
pub struct WorkingMemory {
    cache: LruCache<String, Slot>,
    overlap_threshold: f64,
    ttl: Duration,
}

impl WorkingMemory {
    pub fn new(config: &SessionConfig) -> Self {
        let capacity = NonZeroUsize::new(config.cache_size.max(1)).expect("capacity is non-zero");
        Self {
            cache: LruCache::new(capacity),
            overlap_threshold: config.overlap_threshold,
            ttl: Duration::from_secs(config.ttl_secs),
        }
    }

    /// Return the cached result set when the query's token overlap with the
    /// session's previous working set clears the threshold.
    pub fn lookup(&mut self, session: &str, query: &str) -> Option<Vec<RecallResult>> {
        let expired = self.cache.get(session)?.stored_at.elapsed() > self.ttl;
        if expired {
            self.cache.pop(session);
            return None;
        }
        let slot = self.cache.peek(session)?;

        let query_tokens = super::tokenize(query);
        if query_tokens.is_empty() {
            return None;
        }
        let hits = query_tokens.iter().filter(|t| slot.tokens.contains(*t)).count();
        let overlap = hits as f64 / query_tokens.len() as f64;
        if overlap >= self.overlap_threshold {
            tracing::debug!(session, overlap, "working-memory cache hit");
            return Some(slot.results.clone());
        }
        None
    }

    /// Store a session's fresh result set.
    pub fn store(&mut self, session: &str, query: &str, results: &[RecallResult]) {
        if results.is_empty() {
            return;
        }
        let mut tokens = super::tokenize(query);
        for result in results {
            tokens.extend(super::tokenize(&result.content));
        }
        self.cache.put(
            session.to_string(),
            Slot {
                tokens,
                results: results.to_vec(),
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop all cached sessions.
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}
