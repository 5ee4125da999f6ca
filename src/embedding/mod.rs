//! Embedding provider contract and selection.
//!
//! The engine treats providers as interchangeable: anything that can turn
//! text into a fixed-dimension vector and answer an availability probe.
//! Selection modes:
//!
//! - `auto` — probe providers in order (local daemon, then remote API) and
//!   use the first available; fall back to text-only retrieval if none.
//! - explicit name — attempt that provider; on failure, fall back down the
//!   auto chain unless the config forbids it.
//! - `none` — disable vector features entirely.
//!
//! All calls are blocking; retrieval and consolidation never suspend inside
//! the engine, so the only blocking points are provider round-trips and
//! store I/O.

pub mod ollama;
pub mod openai;

use anyhow::{bail, Result};

use crate::config::EmbeddingConfig;

/// Trait for embedding text into vectors.
///
/// Implementations produce vectors of a fixed dimension per model; the store
/// enforces that a single dimension is used across its lifetime.
pub trait EmbeddingProvider: Send + Sync {
    /// Short provider name ("ollama", "openai").
    fn name(&self) -> &str;

    /// Model identifier in use.
    fn model(&self) -> &str;

    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Cheap availability probe. Used for auto-selection; a `true` here does
    /// not guarantee later `embed` calls succeed.
    fn is_available(&self) -> bool;
}

/// Create a provider from config, or `None` for text-only operation.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Option<Box<dyn EmbeddingProvider>>> {
    match config.provider.as_str() {
        "none" => Ok(None),
        "auto" => Ok(auto_select(config)),
        "ollama" => {
            let provider = ollama::OllamaProvider::new(config);
            if provider.is_available() {
                return Ok(Some(Box::new(provider)));
            }
            if config.allow_fallback {
                tracing::warn!("ollama unavailable, falling back to auto-detection");
                return Ok(auto_select(config));
            }
            bail!("embedding provider 'ollama' is not available at {}", config.ollama_url)
        }
        "openai" => {
            let provider = openai::OpenAiProvider::new(config)?;
            if provider.is_available() {
                return Ok(Some(Box::new(provider)));
            }
            if config.allow_fallback {
                tracing::warn!("openai unavailable, falling back to auto-detection");
                return Ok(auto_select(config));
            }
            bail!("embedding provider 'openai' is not available (is OPENAI_API_KEY set?)")
        }
        other => bail!("unknown embedding provider: {other}. Supported: auto, ollama, openai, none"),
    }
}

/// Probe the chain: local daemon first (fast, free), then remote API.
/// Returns `None` when nothing answers — the engine runs text-only.
fn auto_select(config: &EmbeddingConfig) -> Option<Box<dyn EmbeddingProvider>> {
    let ollama = ollama::OllamaProvider::new(config);
    if ollama.is_available() {
        tracing::info!(model = ollama.model(), "selected ollama embedding provider");
        return Some(Box::new(ollama));
    }

    if let Ok(openai) = openai::OpenAiProvider::new(config) {
        if openai.is_available() {
            tracing::info!(model = openai.model(), "selected openai embedding provider");
            return Some(Box::new(openai));
        }
    }

    tracing::warn!("no embedding provider available, running text-only retrieval");
    None
}

/// Cosine similarity between two vectors. Returns 0.0 for mismatched
/// lengths or zero-norm inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += f64::from(x) * f64::from(y);
        norm_a += f64::from(x) * f64::from(x);
        norm_b += f64::from(y) * f64::from(y);
    }

    let magnitude = norm_a.sqrt() * norm_b.sqrt();
    if magnitude == 0.0 {
        0.0
    } else {
        dot / magnitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.3f32, -0.4, 0.5];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        let a = vec![1.0f32, 0.0];
        let b = vec![0.0f32, 1.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn cosine_handles_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn none_provider_disables_vectors() {
        let mut config = EmbeddingConfig::default();
        config.provider = "none".into();
        assert!(create_provider(&config).unwrap().is_none());
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let mut config = EmbeddingConfig::default();
        config.provider = "telepathy".into();
        assert!(create_provider(&config).is_err());
    }
}
