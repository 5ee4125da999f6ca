//! Local Ollama daemon embedding provider.
//!
//! Probes `GET /api/tags` and embeds via `POST /api/embeddings`. Free,
//! local, and the first choice in the auto-detection chain.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use super::EmbeddingProvider;
use crate::config::EmbeddingConfig;

const DEFAULT_MODEL: &str = "nomic-embed-text";

pub struct OllamaProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig) -> Self {
        let model = if config.model.is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            config.model.clone()
        };
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
            model,
        }
    }
}

impl EmbeddingProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "model": self.model, "prompt": text }))
            .send()
            .context("ollama embedding request failed")?
            .error_for_status()
            .context("ollama embedding request rejected")?;

        let body: EmbeddingsResponse = response
            .json()
            .context("failed to decode ollama embedding response")?;
        if body.embedding.is_empty() {
            anyhow::bail!("ollama returned an empty embedding for model {}", self.model);
        }
        Ok(body.embedding)
    }

    fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).timeout(Duration::from_secs(2)).send() {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "ollama probe failed");
                false
            }
        }
    }
}
