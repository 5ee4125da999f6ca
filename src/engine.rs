//! The engine façade — the public operation surface.
//!
//! An [`Engine`] owns one SQLite connection, the validated configuration,
//! an optional embedding provider, a per-session working-memory cache, and
//! a telemetry baseline tracker. All resources are scoped to the instance:
//! opened at construction, released on drop. One engine instance owns the
//! store file at its path; multi-process use requires external coordination.

use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

use crate::config::MnemoConfig;
use crate::db::{self, HealthReport};
use crate::embedding::{self, EmbeddingProvider};
use crate::memory::anomaly::{BaselineTracker, MetricBaseline};
use crate::memory::consolidation::{self, ConsolidationReport};
use crate::memory::session::WorkingMemory;
use crate::memory::stats::StatsResponse;
use crate::memory::types::{HebbianLink, MemoryEntry, MemoryKind, RecallResult};
use crate::memory::{forgetting, graph, hebbian, now_secs, reward, search, stats, store, vector};

/// Optional attributes for [`Engine::add`].
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    /// Encoding importance in [0, 1]. Defaults to the kind's base value.
    pub importance: Option<f64>,
    /// Short summary, indexed alongside the content.
    pub summary: String,
    /// Tags are appended to the content for searchability.
    pub tags: Vec<String>,
    /// (entity, relation) graph links to record.
    pub entities: Vec<(String, String)>,
    /// Id of an existing memory this one supersedes.
    pub contradicts: Option<String>,
    /// Source identifier (filename, conversation id, ...).
    pub source: String,
    /// Creation-time override (epoch seconds), for importing past events.
    pub created_at: Option<f64>,
}

/// Options for [`Engine::recall`].
#[derive(Debug, Clone)]
pub struct RecallOptions {
    /// Maximum results; 0 uses the configured default.
    pub limit: usize,
    /// Context keywords for spreading activation.
    pub context: Vec<String>,
    /// Restrict results to these kinds.
    pub kinds: Option<Vec<String>>,
    /// Drop results whose confidence falls below this.
    pub min_confidence: f64,
    /// Expand candidates through the entity graph and Hebbian links.
    pub graph_expand: bool,
    /// Session id for the working-memory cache.
    pub session: Option<String>,
}

impl Default for RecallOptions {
    fn default() -> Self {
        Self {
            limit: 0,
            context: Vec::new(),
            kinds: None,
            min_confidence: 0.0,
            graph_expand: true,
            session: None,
        }
    }
}

/// Engine-level statistics: store aggregates plus instance telemetry.
#[derive(Debug, Serialize)]
pub struct EngineStats {
    #[serde(flatten)]
    pub store: StatsResponse,
    pub uptime_hours: f64,
    pub anomaly_metrics: HashMap<String, MetricBaseline>,
}

/// A persistent cognitive memory engine.
pub struct Engine {
    conn: Connection,
    config: MnemoConfig,
    provider: Option<Box<dyn EmbeddingProvider>>,
    working_memory: WorkingMemory,
    tracker: BaselineTracker,
    started_at: f64,
}

impl Engine {
    /// Open an engine on the configured database path.
    pub fn open(config: MnemoConfig) -> Result<Self> {
        config.validate().context("invalid configuration")?;
        let conn = db::open_database(config.resolved_db_path())?;
        Self::from_connection(conn, config)
    }

    /// Open an engine on a specific database path, overriding the config.
    pub fn open_at(path: impl AsRef<Path>, config: MnemoConfig) -> Result<Self> {
        config.validate().context("invalid configuration")?;
        let conn = db::open_database(path)?;
        Self::from_connection(conn, config)
    }

    /// Open a non-persistent in-memory engine (tests, throwaway sessions).
    pub fn open_in_memory(config: MnemoConfig) -> Result<Self> {
        config.validate().context("invalid configuration")?;
        let conn = db::open_memory_database()?;
        Self::from_connection(conn, config)
    }

    fn from_connection(conn: Connection, config: MnemoConfig) -> Result<Self> {
        let provider = embedding::create_provider(&config.embedding)?;
        Ok(Self {
            working_memory: WorkingMemory::new(&config.session),
            tracker: BaselineTracker::new(config.anomaly_window_size),
            provider,
            conn,
            config,
            started_at: now_secs(),
        })
    }

    /// The active embedding provider as (name, model), if any.
    pub fn embedding_provider(&self) -> Option<(&str, &str)> {
        self.provider.as_ref().map(|p| (p.name(), p.model()))
    }

    /// The validated configuration in use.
    pub fn config(&self) -> &MnemoConfig {
        &self.config
    }

    // ── Write path ───────────────────────────────────────────────────────

    /// Store a new memory. Returns its id.
    ///
    /// Does not call the embedding provider — use [`Engine::add_with_embedding`]
    /// when a vector should be attached.
    pub fn add(&mut self, content: &str, kind: &str, options: &AddOptions) -> Result<String> {
        let content = content.trim();
        if content.is_empty() {
            bail!("memory content must not be empty");
        }
        let kind: MemoryKind = kind
            .parse()
            .map_err(|e: String| anyhow::anyhow!("{e}. Supported: factual, episodic, relational, emotional, procedural, opinion"))?;
        if let Some(importance) = options.importance {
            if !(0.0..=1.0).contains(&importance) {
                bail!("importance must be in [0, 1], got {importance}");
            }
        }

        // Validate the contradiction target before any state changes
        let contradicted = match options.contradicts.as_deref() {
            Some(old_id) => {
                let old = store::peek_memory(&self.conn, old_id)?
                    .with_context(|| format!("contradicts target not found: {old_id}"))?;
                if let Some(existing) = &old.contradicted_by {
                    bail!(
                        "memory {old_id} is already contradicted by {existing}; \
                         contradict the head of the chain instead"
                    );
                }
                Some(old)
            }
            None => None,
        };

        let stored_content = if options.tags.is_empty() {
            content.to_string()
        } else {
            format!("{content} [tags: {}]", options.tags.join(", "))
        };
        let importance = options
            .importance
            .unwrap_or_else(|| kind.default_importance());
        let created_at = options.created_at.unwrap_or_else(now_secs);

        let mut entry = store::insert_memory(
            &mut self.conn,
            &stored_content,
            &options.summary,
            kind,
            importance,
            &options.source,
            created_at,
        )?;

        if let Some(mut old) = contradicted {
            entry.contradicts = Some(old.id.clone());
            store::update_entry(&self.conn, &entry)?;
            old.contradicted_by = Some(entry.id.clone());
            store::update_entry(&self.conn, &old)?;
        }

        for (entity, relation) in &options.entities {
            graph::add_graph_link(&self.conn, &entry.id, entity, relation)?;
        }

        self.tracker.update("encoding_rate", 1.0);
        tracing::debug!(id = %entry.id, kind = %kind, "memory stored");
        Ok(entry.id)
    }

    /// Store a new memory and attach an embedding vector.
    ///
    /// Provider failures degrade: the memory is stored without a vector and
    /// a warning is logged. May block for one provider round-trip.
    pub fn add_with_embedding(
        &mut self,
        content: &str,
        kind: &str,
        options: &AddOptions,
    ) -> Result<String> {
        let id = self.add(content, kind, options)?;

        if let Some(provider) = &self.provider {
            match provider.embed(content) {
                Ok(embedding) => vector::set_embedding(&self.conn, &id, &embedding)?,
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "embedding failed, stored text-only")
                }
            }
        }
        Ok(id)
    }

    /// Embed every entry still missing a vector. Returns the number
    /// embedded. Fails when no provider is configured.
    pub fn backfill_embeddings(&mut self) -> Result<usize> {
        let Some(provider) = &self.provider else {
            bail!("no embedding provider configured");
        };

        let missing = vector::ids_missing_embedding(&self.conn)?;
        let mut embedded = 0;
        for (id, content) in &missing {
            match provider.embed(content) {
                Ok(embedding) => {
                    vector::set_embedding(&self.conn, id, &embedding)?;
                    embedded += 1;
                }
                Err(e) => tracing::warn!(id = %id, error = %e, "backfill embedding failed"),
            }
        }
        tracing::info!(embedded, total = missing.len(), "embedding backfill complete");
        Ok(embedded)
    }

    // ── Read path ────────────────────────────────────────────────────────

    /// Retrieve ranked memories for a query. Never fails on empty results.
    ///
    /// Side effects: every returned entry gets an access-log append and the
    /// result list becomes a Hebbian co-activation event. A session-cache
    /// hit skips both (the cached list is a subset of a prior real recall).
    pub fn recall(&mut self, query: &str, options: &RecallOptions) -> Result<Vec<RecallResult>> {
        if let Some(session) = &options.session {
            if let Some(cached) = self.working_memory.lookup(session, query) {
                return Ok(cached);
            }
        }

        let kinds: Option<Vec<MemoryKind>> = match &options.kinds {
            Some(names) => Some(
                names
                    .iter()
                    .map(|name| name.parse::<MemoryKind>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| anyhow::anyhow!(e))?,
            ),
            None => None,
        };

        // Embedding failures degrade to lexical-only retrieval
        let query_vector = self.provider.as_ref().and_then(|p| match p.embed(query) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(error = %e, "query embedding failed, lexical-only recall");
                None
            }
        });

        let limit = if options.limit == 0 {
            self.config.retrieval.default_limit
        } else {
            options.limit
        };

        let request = search::RecallQuery {
            text: query,
            vector: query_vector.as_deref(),
            context: &options.context,
            kinds: kinds.as_deref(),
            min_confidence: options.min_confidence,
            graph_expand: options.graph_expand,
            limit,
        };
        let results = search::recall(&mut self.conn, &request, &self.config, now_secs())?;

        self.tracker.update("retrieval_count", results.len() as f64);
        if let Some(session) = &options.session {
            self.working_memory.store(session, query, &results);
        }
        Ok(results)
    }

    /// Fetch a single memory by id, recording an access.
    pub fn get(&self, id: &str) -> Result<Option<MemoryEntry>> {
        store::get_memory(&self.conn, id, now_secs())
    }

    /// Fetch a single memory by id without recording an access.
    pub fn peek(&self, id: &str) -> Result<Option<MemoryEntry>> {
        store::peek_memory(&self.conn, id)
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    /// Run one consolidation cycle with a simulated time step in days.
    pub fn consolidate(&mut self, days: f64) -> Result<ConsolidationReport> {
        if days < 0.0 {
            bail!("consolidation time step must be non-negative, got {days}");
        }
        let hebbian_decay = self
            .config
            .hebbian
            .enabled
            .then_some(self.config.hebbian.decay_factor);
        consolidation::run_cycle(
            &mut self.conn,
            days,
            &self.config.dynamics,
            hebbian_decay,
            now_secs(),
        )
    }

    /// Forget a specific memory or prune all entries whose effective
    /// strength falls below a threshold. Exactly one argument must be
    /// supplied. Returns the number of memories removed; forgetting an
    /// already-forgotten id is a no-op that returns 0.
    pub fn forget(&mut self, id: Option<&str>, threshold: Option<f64>) -> Result<usize> {
        match (id, threshold) {
            (Some(_), Some(_)) => bail!("forget takes either an id or a threshold, not both"),
            (None, None) => bail!("forget requires an id or a threshold"),
            (Some(id), None) => Ok(usize::from(store::delete_memory(&self.conn, id)?)),
            (None, Some(threshold)) => {
                forgetting::prune_forgotten(&self.conn, threshold, now_secs())
            }
        }
    }

    /// Prune using the configured forget threshold.
    pub fn forget_below_configured(&mut self) -> Result<usize> {
        let threshold = self.config.dynamics.forget_threshold;
        self.forget(None, Some(threshold))
    }

    /// Process user feedback as a reward signal. Neutral or low-confidence
    /// feedback is a no-op. Returns the number of memories affected.
    pub fn reward(&mut self, feedback: &str) -> Result<usize> {
        let (polarity, magnitude) = reward::detect_feedback(feedback, &self.config.reward);
        if magnitude < 0.3 {
            return Ok(0);
        }
        reward::apply_reward(&mut self.conn, polarity, magnitude, &self.config.reward)
    }

    /// Pin a memory: exempt from decay, downscaling, and pruning.
    pub fn pin(&mut self, id: &str) -> Result<()> {
        self.set_pinned(id, true)
    }

    /// Unpin a memory: resume normal dynamics.
    pub fn unpin(&mut self, id: &str) -> Result<()> {
        self.set_pinned(id, false)
    }

    fn set_pinned(&mut self, id: &str, pinned: bool) -> Result<()> {
        let mut entry = store::peek_memory(&self.conn, id)?
            .with_context(|| format!("memory not found: {id}"))?;
        entry.pinned = pinned;
        store::update_entry(&self.conn, &entry)
    }

    /// Correct a memory: store the new content as a fresh memory of the same
    /// kind and importance that contradicts the old one. Returns the new id.
    pub fn update_memory(&mut self, old_id: &str, new_content: &str) -> Result<String> {
        let old = store::peek_memory(&self.conn, old_id)?
            .with_context(|| format!("memory not found: {old_id}"))?;

        let options = AddOptions {
            importance: Some(old.importance),
            source: format!("correction:{old_id}"),
            contradicts: Some(old_id.to_string()),
            ..Default::default()
        };
        self.add(new_content, old.kind.as_str(), &options)
    }

    // ── Introspection ────────────────────────────────────────────────────

    /// Hebbian links for one memory, or all live links.
    pub fn hebbian_links(&self, id: Option<&str>) -> Result<Vec<HebbianLink>> {
        match id {
            None => hebbian::all_links(&self.conn),
            Some(id) => {
                let mut links = Vec::new();
                for (neighbor, strength) in hebbian::neighbors_with_strength(&self.conn, id, 0.0)? {
                    links.push(HebbianLink {
                        source_id: id.to_string(),
                        target_id: neighbor,
                        strength,
                        coactivation_count: 0,
                    });
                }
                Ok(links)
            }
        }
    }

    /// Store-wide aggregates plus instance telemetry. Never mutates.
    pub fn stats(&self) -> Result<EngineStats> {
        let now = now_secs();
        Ok(EngineStats {
            store: stats::memory_stats(&self.conn, now)?,
            uptime_hours: (now - self.started_at) / 3600.0,
            anomaly_metrics: self.tracker.metrics(),
        })
    }

    /// Database health report. Never mutates.
    pub fn health(&self) -> Result<HealthReport> {
        db::check_database_health(&self.conn)
    }

    /// Export a self-contained snapshot of the store to `path`.
    pub fn export(&self, path: impl AsRef<Path>) -> Result<()> {
        store::export_database(&self.conn, path)
    }

    /// Close the engine, releasing the store handle.
    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| anyhow::anyhow!("failed to close database: {e}"))
    }
}
