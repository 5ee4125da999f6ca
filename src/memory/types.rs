//! Core memory type definitions.
//!
//! Defines [`MemoryKind`] (the six cognitive memory categories), [`MemoryLayer`]
//! (the lifecycle buckets), [`MemoryEntry`] (a full record with its access
//! history), and the result records returned by recall.

use serde::{Deserialize, Serialize};

/// The six cognitive memory kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    /// Facts about the world or the user.
    Factual,
    /// Events and session logs — lowest default importance, fastest to fade.
    Episodic,
    /// Relationships and preferences between people and things.
    Relational,
    /// Emotionally charged moments — encoded strongly, slow to fade.
    Emotional,
    /// Workflows, rules, how-to knowledge.
    Procedural,
    /// Subjective judgments and stances.
    Opinion,
}

impl MemoryKind {
    /// All kinds, in a stable order (used for stats pre-seeding).
    pub const ALL: [MemoryKind; 6] = [
        Self::Factual,
        Self::Episodic,
        Self::Relational,
        Self::Emotional,
        Self::Procedural,
        Self::Opinion,
    ];

    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Factual => "factual",
            Self::Episodic => "episodic",
            Self::Relational => "relational",
            Self::Emotional => "emotional",
            Self::Procedural => "procedural",
            Self::Opinion => "opinion",
        }
    }

    /// Default encoding importance when the caller does not supply one.
    pub fn default_importance(&self) -> f64 {
        match self {
            Self::Factual => 0.5,
            Self::Episodic => 0.3,
            Self::Relational => 0.6,
            Self::Emotional => 0.8,
            Self::Procedural => 0.6,
            Self::Opinion => 0.4,
        }
    }

    /// Base retrievability time-constant in days. Emotional and procedural
    /// memories are the most durable; episodic the most fleeting.
    pub fn base_stability_days(&self) -> f64 {
        match self {
            Self::Factual => 14.0,
            Self::Episodic => 3.0,
            Self::Relational => 10.0,
            Self::Emotional => 21.0,
            Self::Procedural => 30.0,
            Self::Opinion => 7.0,
        }
    }
}

impl std::fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "factual" => Ok(Self::Factual),
            "episodic" => Ok(Self::Episodic),
            "relational" => Ok(Self::Relational),
            "emotional" => Ok(Self::Emotional),
            "procedural" => Ok(Self::Procedural),
            "opinion" => Ok(Self::Opinion),
            _ => Err(format!("unknown memory kind: {s}")),
        }
    }
}

/// Coarse lifecycle bucket for a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryLayer {
    /// Consolidated long-term knowledge.
    Core,
    /// Recently encoded, still labile.
    Working,
    /// Weak or long-inactive — searchable but never pulled in by expansion.
    Archive,
}

impl MemoryLayer {
    pub const ALL: [MemoryLayer; 3] = [Self::Core, Self::Working, Self::Archive];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Working => "working",
            Self::Archive => "archive",
        }
    }
}

impl std::fmt::Display for MemoryLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryLayer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "core" => Ok(Self::Core),
            "working" => Ok(Self::Working),
            "archive" => Ok(Self::Archive),
            _ => Err(format!("unknown memory layer: {s}")),
        }
    }
}

/// A memory record, matching the `memories` table schema plus its access history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// UUID v7 (time-sortable) primary key.
    pub id: String,
    /// Full text content.
    pub content: String,
    /// Optional short summary, mirrored into the FTS index alongside content.
    pub summary: String,
    /// Cognitive category.
    pub kind: MemoryKind,
    /// Lifecycle bucket.
    pub layer: MemoryLayer,
    /// Creation time, epoch seconds.
    pub created_at: f64,
    /// Access timestamps (epoch seconds), oldest first. Always contains at
    /// least the creation access.
    pub access_times: Vec<f64>,
    /// Fast-decaying short-term strength trace (r1).
    pub working_strength: f64,
    /// Slow-decaying long-term strength trace (r2).
    pub core_strength: f64,
    /// Encoding importance in [0, 1].
    pub importance: f64,
    /// Pinned entries are exempt from decay, downscaling, and pruning.
    pub pinned: bool,
    /// Number of consolidation cycles this entry has been through.
    pub consolidation_count: u32,
    /// Epoch seconds of the last consolidation cycle, if any.
    pub last_consolidated: Option<f64>,
    /// Caller-supplied source tag (filename, conversation id, ...).
    pub source: String,
    /// Forward correction link: this entry supersedes the referenced one.
    pub contradicts: Option<String>,
    /// Reverse correction link: this entry was superseded by the referenced one.
    pub contradicted_by: Option<String>,
    /// Optional embedding vector (dimension fixed per store).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl MemoryEntry {
    /// Age in days relative to `now` (epoch seconds).
    pub fn age_days(&self, now: f64) -> f64 {
        ((now - self.created_at) / 86_400.0).max(0.0)
    }

    /// Most recent access time, falling back to creation.
    pub fn last_access(&self) -> f64 {
        self.access_times.last().copied().unwrap_or(self.created_at)
    }
}

/// Confidence band attached to every recall result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLabel {
    Certain,
    Likely,
    Uncertain,
    Vague,
}

impl ConfidenceLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Certain => "certain",
            Self::Likely => "likely",
            Self::Uncertain => "uncertain",
            Self::Vague => "vague",
        }
    }
}

impl std::fmt::Display for ConfidenceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single ranked recall result.
#[derive(Debug, Clone, Serialize)]
pub struct RecallResult {
    pub id: String,
    pub content: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub summary: String,
    pub kind: MemoryKind,
    /// Metacognitive confidence in [0, 1].
    pub confidence: f64,
    pub confidence_label: ConfidenceLabel,
    /// Effective strength `(r1 + r2) * R` at recall time.
    pub strength: f64,
    /// Composite retrieval activation (the ranking score).
    pub activation: f64,
    pub age_days: f64,
    pub layer: MemoryLayer,
    pub importance: f64,
    /// Set when a newer memory contradicts this one.
    pub contradicted: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub source: String,
}

/// A symmetric co-activation edge between two memories.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HebbianLink {
    pub source_id: String,
    pub target_id: String,
    pub strength: f64,
    pub coactivation_count: u32,
}
