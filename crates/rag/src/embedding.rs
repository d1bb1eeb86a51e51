use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::env;
use tracing::debug;

use ragbench_core::{HashEmbedder, HashEmbedderConfig};

const DEFAULT_REMOTE_MODEL: &str = "text-embedding-3-small";
const DEFAULT_REMOTE_BASE_URL: &str = "https://api.openai.com/v1";

/// Which encoder turns text into vectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "hash".to_string(),
            model: DEFAULT_REMOTE_MODEL.to_string(),
            dimensions: HashEmbedderConfig::default().dimensions,
        }
    }
}

impl EmbeddingSettings {
    pub fn apply_env(&mut self) {
        if let Ok(provider) = env::var("EMBEDDING_PROVIDER") {
            self.provider = provider;
        }
        if let Ok(model) = env::var("EMBEDDING_MODEL") {
            self.model = model;
        }
        if let Some(dims) = env::var("HASH_EMBED_DIMENSIONS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
        {
            self.dimensions = dims;
        }
    }
}

#[derive(Clone)]
pub enum EmbeddingBackend {
    Hash(HashEmbedder),
    Remote(RemoteEmbeddingClient),
}

#[derive(Clone)]
pub struct EmbeddingClient {
    backend: EmbeddingBackend,
}

impl EmbeddingClient {
    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self> {
        match settings.provider.trim().to_lowercase().as_str() {
            "openai" | "remote" => Ok(Self {
                backend: EmbeddingBackend::Remote(RemoteEmbeddingClient::new(&settings.model)?),
            }),
            "hash" => Ok(Self {
                backend: EmbeddingBackend::Hash(HashEmbedder::new(HashEmbedderConfig {
                    dimensions: settings.dimensions,
                    seed: 1337,
                })),
            }),
            other => Err(anyhow!("unknown embedding provider {other}")),
        }
    }

    pub fn hash() -> Self {
        Self {
            backend: EmbeddingBackend::Hash(HashEmbedder::new(HashEmbedderConfig::default())),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match &self.backend {
            EmbeddingBackend::Hash(_) => "hash",
            EmbeddingBackend::Remote(_) => "remote",
        }
    }

    pub fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        match &self.backend {
            EmbeddingBackend::Hash(embedder) => Ok(inputs
                .iter()
                .map(|text| embedder.embed_text(text))
                .collect()),
            EmbeddingBackend::Remote(client) => client.embed_batch(inputs),
        }
    }

    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let inputs = vec![text.to_string()];
        let mut output = self.embed_batch(&inputs)?;
        output
            .pop()
            .ok_or_else(|| anyhow!("embedding backend returned no vector"))
    }
}

/// OpenAI-compatible `/embeddings` endpoint.
#[derive(Clone)]
pub struct RemoteEmbeddingClient {
    http: Client,
    model: String,
    api_key: String,
    base_url: String,
}

impl RemoteEmbeddingClient {
    pub fn new(model: &str) -> Result<Self> {
        let api_key = env::var("EMBEDDING_API_KEY")
            .or_else(|_| env::var("OPENAI_API_KEY"))
            .map_err(|_| anyhow!("EMBEDDING_API_KEY or OPENAI_API_KEY is required for remote embeddings"))?;
        let base_url =
            env::var("EMBEDDING_BASE_URL").unwrap_or_else(|_| DEFAULT_REMOTE_BASE_URL.to_string());
        Ok(Self {
            http: Client::new(),
            model: model.to_string(),
            api_key,
            base_url,
        })
    }

    pub fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let payload = serde_json::json!({
            "model": self.model,
            "input": inputs,
        });
        debug!(model = %self.model, inputs = inputs.len(), "requesting embeddings");
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .context("embeddings request failed")?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "embeddings request failed: {}",
                response.status()
            ));
        }
        let mut parsed: EmbeddingResponse = response
            .json()
            .context("failed to decode embeddings response")?;
        parsed.data.sort_by_key(|d| d.index);
        if parsed.data.len() != inputs.len() {
            return Err(anyhow!(
                "expected {} embeddings, got {}",
                inputs.len(),
                parsed.data.len()
            ));
        }
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}
