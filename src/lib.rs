//! Persistent cognitive memory for long-running AI agents.
//!
//! mnemo stores textual memories with metadata and returns them ranked on
//! demand — but unlike a vector database it is a *dynamical* store: every
//! memory carries strength state that evolves with time, access, feedback,
//! and contradiction. Retrieval is ranked by a composite activation score
//! drawn from cognitive psychology:
//!
//! - **ACT-R base-level activation** — recency and frequency of access,
//!   power-law decay
//! - **Ebbinghaus retrievability** — exponential forgetting with a
//!   stability that grows on repeated retrieval (spacing effect)
//! - **Hebbian co-activation links** — memories recalled together wire
//!   together and later surface together
//! - **Importance weighting and contradiction suppression** — superseded
//!   knowledge is returned, flagged, and penalized, never silently lost
//!
//! # Architecture
//!
//! - **Storage**: a single SQLite file with FTS5 for keyword search and a
//!   JSON-encoded embedding column for vector search (linear-scan cosine)
//! - **Retrieval**: hybrid BM25 + cosine candidates, adaptive fusion,
//!   entity-graph and Hebbian expansion, ACT-R activation ranking
//! - **Consolidation**: an on-demand "sleep" cycle that decays, transfers
//!   working strength into core strength, replays a recency-weighted
//!   sample, rebalances layers, and downscales globally
//! - **Embeddings**: pluggable providers (local Ollama daemon, remote
//!   OpenAI API) behind an auto-detection chain, with graceful degradation
//!   to lexical-only retrieval
//!
//! # Quick start
//!
//! ```no_run
//! use mnemo::{AddOptions, Engine, MnemoConfig, RecallOptions};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut config = MnemoConfig::default();
//! config.embedding.provider = "none".into();
//! let mut memory = Engine::open_in_memory(config)?;
//!
//! memory.add("user prefers action over discussion", "relational", &AddOptions {
//!     importance: Some(0.7),
//!     ..Default::default()
//! })?;
//!
//! for result in memory.recall("what does the user prefer?", &RecallOptions::default())? {
//!     println!("[{}] {}", result.confidence_label, result.content);
//! }
//!
//! memory.consolidate(1.0)?; // one simulated day of "sleep"
//! memory.reward("good job, exactly right")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`config`] — configuration record, presets, TOML loading, validation
//! - [`db`] — SQLite open, schema, additive migrations, health checks
//! - [`embedding`] — embedding provider contract and selection chain
//! - [`memory`] — the dynamics engine: store, scoring, retrieval, lifecycle
//! - [`Engine`] — the public operation surface

pub mod config;
pub mod db;
pub mod embedding;
pub mod engine;
pub mod memory;

pub use config::MnemoConfig;
pub use db::HealthReport;
pub use engine::{AddOptions, Engine, EngineStats, RecallOptions};
pub use memory::consolidation::ConsolidationReport;
pub use memory::types::{
    ConfidenceLabel, HebbianLink, MemoryEntry, MemoryKind, MemoryLayer, RecallResult,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
