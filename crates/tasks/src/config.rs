use std::env;
use std::fs;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use tracing::debug;

use ragbench_core::{ChunkConfig, LoadPolicy};
use ragbench_rag::{
    Completion, EmbeddingClient, EmbeddingSettings, LlmClient, LlmProvider, LlmResponse,
    DEFAULT_TOP_K,
};

pub const DEFAULT_CONFIG_FILE: &str = "ragbench.toml";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5600";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RagbenchConfig {
    pub provider: String,
    pub model: Option<String>,
    pub outputs_dir: PathBuf,
    pub data_dir: PathBuf,
    pub load_policy: LoadPolicy,
    pub top_k: usize,
    pub bind_addr: String,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkConfig,
}

impl Default for RagbenchConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Together.as_str().to_string(),
            model: None,
            outputs_dir: PathBuf::from("outputs"),
            data_dir: PathBuf::from("data"),
            load_policy: LoadPolicy::Strict,
            top_k: DEFAULT_TOP_K,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            embedding: EmbeddingSettings::default(),
            chunking: ChunkConfig::default(),
        }
    }
}

impl RagbenchConfig {
    /// Reads the TOML file (an explicit path must exist, the default one may
    /// be absent) and applies environment overrides on top.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let from_env = env::var("RAGBENCH_CONFIG").ok().map(PathBuf::from);
        let (path, required) = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => (path, true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        let mut config = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            debug!(path = %path.display(), "loaded config file");
            Self::from_toml_str(&raw)
                .with_context(|| format!("invalid ragbench config {}", path.display()))?
        } else if required {
            return Err(anyhow!("config file {} does not exist", path.display()));
        } else {
            Self::default()
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        config.embedding.apply_env();
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        if config.top_k == 0 {
            return Err(anyhow!("top_k must be a positive integer"));
        }
        Ok(config)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(provider) = lookup("RAGBENCH_PROVIDER") {
            self.provider = provider;
        }
        if let Some(model) = lookup("RAGBENCH_MODEL") {
            self.model = Some(model);
        }
        if let Some(dir) = lookup("RAGBENCH_OUTPUTS") {
            self.outputs_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("RAGBENCH_DATA") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(policy) = lookup("RAGBENCH_LOAD_POLICY") {
            self.load_policy = policy.parse()?;
        }
        if let Some(top_k) = lookup("RAGBENCH_TOP_K") {
            let parsed: NonZeroUsize = top_k.trim().parse().with_context(|| {
                format!("RAGBENCH_TOP_K must be a positive integer, got {top_k}")
            })?;
            self.top_k = parsed.get();
        }
        if let Some(addr) = lookup("BIND_ADDR") {
            self.bind_addr = addr;
        }
        Ok(())
    }

    pub fn provider(&self) -> Result<LlmProvider> {
        LlmProvider::from_str(&self.provider)
            .ok_or_else(|| anyhow!("unknown provider {}", self.provider))
    }

    pub fn model_name(&self) -> Result<String> {
        match &self.model {
            Some(model) => Ok(model.clone()),
            None => Ok(self.provider()?.default_model().to_string()),
        }
    }

    pub fn llm_client(&self) -> Result<LlmClient> {
        LlmClient::new(self.provider()?, self.model_name()?)
    }

    pub fn embedding_client(&self) -> Result<EmbeddingClient> {
        EmbeddingClient::from_settings(&self.embedding)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_addr
            .parse()
            .with_context(|| format!("invalid bind address {}", self.bind_addr))
    }
}

/// Builds the chat client on first use, so tasks that never prompt a model
/// run without API keys.
pub struct DeferredLlm {
    provider: LlmProvider,
    model: String,
    client: OnceCell<LlmClient>,
}

impl DeferredLlm {
    pub fn from_config(config: &RagbenchConfig) -> Result<Self> {
        Ok(Self {
            provider: config.provider()?,
            model: config.model_name()?,
            client: OnceCell::new(),
        })
    }
}

impl Completion for DeferredLlm {
    fn complete(&self, prompt: &str) -> Result<LlmResponse> {
        let client = self
            .client
            .get_or_try_init(|| LlmClient::new(self.provider, self.model.clone()))?;
        client.complete(prompt)
    }
}
