use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Full configuration record for a mnemo engine instance.
///
/// Every knob has a literature-default value; a config file only needs the
/// sections it overrides. Invalid combinations are rejected by [`validate`]
/// at engine construction.
///
/// [`validate`]: MnemoConfig::validate
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MnemoConfig {
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub dynamics: DynamicsConfig,
    pub scoring: ScoringConfig,
    pub hebbian: HebbianConfig,
    pub reward: RewardConfig,
    pub retrieval: RetrievalConfig,
    pub session: SessionConfig,
    /// Rolling-baseline window for encoding/retrieval rate tracking.
    pub anomaly_window_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file. `:memory:` is not accepted here —
    /// use [`crate::Engine::open_in_memory`] for non-persistent stores.
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider selection: `auto`, `ollama`, `openai`, or `none`.
    pub provider: String,
    /// Model override. Empty uses the provider's default.
    pub model: String,
    /// When an explicit provider is unavailable, fall back down the auto
    /// chain instead of failing engine construction.
    pub allow_fallback: bool,
    /// Base URL of the local Ollama daemon.
    pub ollama_url: String,
    /// Per-request timeout for provider HTTP calls.
    pub timeout_secs: u64,
}

/// Memory-dynamics parameters (decay, transfer, replay, layers, pruning).
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DynamicsConfig {
    /// Working-strength decay rate per simulated day.
    pub mu1: f64,
    /// Core-strength decay rate per simulated day. Must be below `mu1`.
    pub mu2: f64,
    /// Transfer rate working -> core per simulated day.
    pub alpha: f64,
    /// Fraction of the population replayed each consolidation cycle.
    pub replay_ratio: f64,
    /// Working-strength boost given to each replayed entry.
    pub replay_boost: f64,
    /// Core-strength level at which an entry promotes to the core layer.
    pub promote_threshold: f64,
    /// Effective strength below which a working entry demotes to archive.
    pub demote_threshold: f64,
    /// Effective strength below which a core entry slips back to working.
    pub archive_threshold: f64,
    /// Effective strength below which unpinned entries are pruned.
    pub forget_threshold: f64,
    /// Per-cycle global multiplier applied to all unpinned strengths.
    pub downscale_factor: f64,
}

/// Retrieval-scoring coefficients.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScoringConfig {
    /// Weight of the context-keyword spreading term.
    pub spread_weight: f64,
    /// Weight of the importance term.
    pub importance_weight: f64,
    /// Weight of the Hebbian spreading bonus.
    pub hebbian_weight: f64,
    /// Fixed activation penalty for contradicted entries.
    pub contradiction_penalty: f64,
    /// Minimum link strength for a Hebbian link to spread or expand.
    pub hebbian_floor: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HebbianConfig {
    pub enabled: bool,
    /// Co-activation count at which a link materializes.
    pub formation_threshold: u32,
    /// Multiplicative strengthening rate per co-activation after formation.
    pub strengthen_rate: f64,
    /// Per-cycle strength multiplier.
    pub decay_factor: f64,
    /// Hard cap on link strength.
    pub max_strength: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RewardConfig {
    /// Base magnitude of importance/strength adjustments.
    pub magnitude: f64,
    /// How many recently-accessed memories feedback applies to.
    pub recent_n: usize,
    /// Positive cue phrases; matching is case-insensitive substring.
    pub positive_cues: Vec<String>,
    /// Negative cue phrases.
    pub negative_cues: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Default result count for recall.
    pub default_limit: usize,
    /// Candidate pool size from the lexical channel.
    pub fts_candidates: usize,
    /// Candidate pool size from the semantic channel.
    pub vector_candidates: usize,
    /// Minimum cosine similarity for semantic candidates.
    pub min_similarity: f64,
    /// How many top fused candidates seed graph/Hebbian expansion.
    pub expansion_seeds: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    /// Working-memory slots (Miller bound).
    pub cache_size: usize,
    /// Token-overlap fraction above which the cached result set is replayed.
    pub overlap_threshold: f64,
    /// Cache entry time-to-live in seconds.
    pub ttl_secs: u64,
}

impl Default for MnemoConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            embedding: EmbeddingConfig::default(),
            dynamics: DynamicsConfig::default(),
            scoring: ScoringConfig::default(),
            hebbian: HebbianConfig::default(),
            reward: RewardConfig::default(),
            retrieval: RetrievalConfig::default(),
            session: SessionConfig::default(),
            anomaly_window_size: 50,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_mnemo_dir()
            .join("memory.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "auto".into(),
            model: String::new(),
            allow_fallback: true,
            ollama_url: "http://localhost:11434".into(),
            timeout_secs: 10,
        }
    }
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self {
            mu1: 0.1,
            mu2: 0.01,
            alpha: 0.2,
            replay_ratio: 0.2,
            replay_boost: 0.05,
            promote_threshold: 0.6,
            demote_threshold: 0.05,
            archive_threshold: 0.02,
            forget_threshold: 0.01,
            downscale_factor: 0.95,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            spread_weight: 0.5,
            importance_weight: 0.7,
            hebbian_weight: 0.3,
            contradiction_penalty: 3.0,
            hebbian_floor: 0.1,
        }
    }
}

impl Default for HebbianConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            formation_threshold: 3,
            strengthen_rate: 0.1,
            decay_factor: 0.95,
            max_strength: 5.0,
        }
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            magnitude: 0.2,
            recent_n: 3,
            positive_cues: [
                "good job", "well done", "thank you", "thanks", "great", "perfect",
                "exactly", "exactly right", "correct", "awesome", "nice", "helpful",
                "that's right", "love it",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            negative_cues: [
                "wrong", "incorrect", "bad", "mistake", "terrible", "useless",
                "not right", "that's not", "don't do that", "stop doing", "unhelpful",
                "not what i asked",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: 5,
            fts_candidates: 100,
            vector_candidates: 100,
            min_similarity: 0.0,
            expansion_seeds: 10,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cache_size: 7,
            overlap_threshold: 0.8,
            ttl_secs: 300,
        }
    }
}

/// Returns `~/.mnemo/`
pub fn default_mnemo_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mnemo")
}

/// Returns the default config file path: `~/.mnemo/config.toml`
pub fn default_config_path() -> PathBuf {
    default_mnemo_dir().join("config.toml")
}

impl MnemoConfig {
    /// Load config from the default TOML file (if it exists) then apply env
    /// var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            MnemoConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Named preset tuned for a workload. Presets differ only in parameter
    /// values, never in behavior.
    pub fn preset(name: &str) -> Result<Self> {
        let mut config = Self::default();
        match name {
            // Conversational agents: fast episodic churn, responsive feedback
            "chatbot" => {
                config.dynamics.mu1 = 0.15;
                config.dynamics.replay_ratio = 0.3;
                config.reward.magnitude = 0.3;
            }
            // Task executors: consolidate procedures quickly, prune harder
            "task-agent" => {
                config.dynamics.promote_threshold = 0.5;
                config.dynamics.forget_threshold = 0.02;
                config.hebbian.strengthen_rate = 0.15;
            }
            // Long-lived companions: slow decay, importance dominates
            "personal-assistant" => {
                config.dynamics.mu1 = 0.05;
                config.dynamics.forget_threshold = 0.005;
                config.scoring.importance_weight = 0.9;
            }
            // Exploratory agents: wide candidate pools, strong association
            "researcher" => {
                config.scoring.hebbian_weight = 0.5;
                config.retrieval.fts_candidates = 200;
                config.retrieval.vector_candidates = 200;
                config.dynamics.downscale_factor = 0.97;
            }
            other => bail!(
                "unknown preset: {other}. Supported: chatbot, task-agent, \
                 personal-assistant, researcher"
            ),
        }
        Ok(config)
    }

    /// Apply environment variable overrides (MNEMO_DB, MNEMO_EMBEDDING_PROVIDER,
    /// MNEMO_OLLAMA_URL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MNEMO_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("MNEMO_EMBEDDING_PROVIDER") {
            self.embedding.provider = val;
        }
        if let Ok(val) = std::env::var("MNEMO_OLLAMA_URL") {
            self.embedding.ollama_url = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    /// Reject impossible parameter combinations. Called at engine
    /// construction; an engine never runs with an invalid config.
    pub fn validate(&self) -> Result<()> {
        let d = &self.dynamics;
        if d.mu1 <= 0.0 || d.mu2 <= 0.0 {
            bail!("decay rates must be positive (mu1={}, mu2={})", d.mu1, d.mu2);
        }
        if d.mu1 <= d.mu2 {
            bail!("working decay must exceed core decay (mu1={} <= mu2={})", d.mu1, d.mu2);
        }
        if d.alpha < 0.0 {
            bail!("transfer rate alpha must be non-negative");
        }
        if !(0.0..=1.0).contains(&d.replay_ratio) {
            bail!("replay_ratio must be in [0, 1], got {}", d.replay_ratio);
        }
        if d.replay_boost < 0.0 {
            bail!("replay_boost must be non-negative");
        }
        if d.demote_threshold >= d.promote_threshold {
            bail!(
                "demote_threshold ({}) must be below promote_threshold ({})",
                d.demote_threshold,
                d.promote_threshold
            );
        }
        if d.archive_threshold < 0.0 || d.forget_threshold < 0.0 {
            bail!("layer and forget thresholds must be non-negative");
        }
        if !(0.0..=1.0).contains(&d.downscale_factor) || d.downscale_factor == 0.0 {
            bail!("downscale_factor must be in (0, 1], got {}", d.downscale_factor);
        }

        let s = &self.scoring;
        if s.spread_weight < 0.0
            || s.importance_weight < 0.0
            || s.hebbian_weight < 0.0
            || s.contradiction_penalty < 0.0
            || s.hebbian_floor < 0.0
        {
            bail!("scoring weights must be non-negative");
        }

        let h = &self.hebbian;
        if h.formation_threshold == 0 {
            bail!("hebbian formation_threshold must be at least 1");
        }
        if !(0.0..1.0).contains(&h.decay_factor) {
            bail!("hebbian decay_factor must be in (0, 1), got {}", h.decay_factor);
        }
        if h.max_strength < 1.0 {
            bail!("hebbian max_strength must be at least 1.0");
        }
        if h.strengthen_rate < 0.0 {
            bail!("hebbian strengthen_rate must be non-negative");
        }

        if !(0.0..=1.0).contains(&self.reward.magnitude) {
            bail!("reward magnitude must be in [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.session.overlap_threshold) {
            bail!("session overlap_threshold must be in [0, 1]");
        }
        if self.anomaly_window_size == 0 {
            bail!("anomaly_window_size must be at least 1");
        }
        match self.embedding.provider.as_str() {
            "auto" | "ollama" | "openai" | "none" => {}
            other => bail!(
                "unknown embedding provider: {other}. Supported: auto, ollama, openai, none"
            ),
        }
        Ok(())
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
