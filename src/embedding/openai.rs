//! Remote OpenAI-compatible embedding provider.
//!
//! Requires `OPENAI_API_KEY` in the environment. Last in the auto-detection
//! chain — a network round-trip per embed call.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use super::EmbeddingProvider;
use crate::config::EmbeddingConfig;

const API_URL: &str = "https://api.openai.com/v1/embeddings";
const DEFAULT_MODEL: &str = "text-embedding-3-small";

pub struct OpenAiProvider {
    client: reqwest::blocking::Client,
    api_key: Option<String>,
    model: String,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = if config.model.is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            config.model.clone()
        };
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            client,
            api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            model,
        })
    }
}

impl EmbeddingProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let api_key = self
            .api_key
            .as_deref()
            .context("OPENAI_API_KEY is not set")?;

        let response = self
            .client
            .post(API_URL)
            .bearer_auth(api_key)
            .json(&serde_json::json!({ "model": self.model, "input": text }))
            .send()
            .context("openai embedding request failed")?
            .error_for_status()
            .context("openai embedding request rejected")?;

        let mut body: EmbeddingsResponse = response
            .json()
            .context("failed to decode openai embedding response")?;
        let first = body
            .data
            .pop()
            .context("openai returned no embedding data")?;
        if first.embedding.is_empty() {
            anyhow::bail!("openai returned an empty embedding for model {}", self.model);
        }
        Ok(first.embedding)
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}
