//! Numbered pipeline stages. Each stage reads the files an earlier stage
//! wrote under the outputs directory and writes its own.

mod groundtruth;
mod prompting;
mod retrieval;

use std::path::PathBuf;

use anyhow::Result;
use once_cell::sync::OnceCell;

use ragbench_core::{load_json_with_policy, ChunkConfig, GroundTruth, LoadPolicy};
use ragbench_rag::{Completion, EmbeddingClient, EmbeddingSettings, DEFAULT_TOP_K};

use crate::config::RagbenchConfig;

pub use groundtruth::{task_4, task_5, task_6, Task6Mode};
pub use prompting::{task_1, task_2, task_3};
pub use retrieval::{task_10, task_7, task_8, task_9};

pub const TASK_1_FILE: &str = "task_1.txt";
pub const TASK_2_FILE: &str = "task_2.txt";
pub const TASK_3_FILE: &str = "task_3.txt";
pub const TASK_4_JSON: &str = "task_4_groundtruth.json";
pub const TASK_4_TEXT: &str = "task_4_groundtruth.txt";
pub const TASK_5_NEEDLE: &str = "task_5_needle_in_haystack.txt";
pub const TASK_5_INSIGHTS: &str = "task_5_insights.json";
pub const TASK_6_REPORT: &str = "task_6_evaluation_report.json";
pub const TASK_7_CHUNKS: &str = "task_7_chunks.json";
pub const TASK_8_CHUNKS: &str = "task_8_chunks.json";
pub const TASK_8_EMBEDDINGS: &str = "task_8_embeddings.json";
pub const TASK_9_RETRIEVAL: &str = "task_9_retrieval_results.json";
pub const TASK_10_PREDICTION: &str = "task_10_prediction.json";
pub const TASK_10_REPORT: &str = "task_10_evaluation_report.json";
pub const TASK_10_TEXT: &str = "task_10.txt";

pub const CHRISTMAS_PASSAGE: &str = "christmas.txt";

/// Everything a stage needs: directories, policies, and the model seams.
pub struct TaskContext<'a> {
    pub outputs: PathBuf,
    pub data: PathBuf,
    pub policy: LoadPolicy,
    pub top_k: usize,
    pub chunking: ChunkConfig,
    model: &'a dyn Completion,
    embedding_settings: EmbeddingSettings,
    embeddings: OnceCell<EmbeddingClient>,
}

impl<'a> TaskContext<'a> {
    pub fn new(
        outputs: impl Into<PathBuf>,
        data: impl Into<PathBuf>,
        model: &'a dyn Completion,
    ) -> Self {
        Self {
            outputs: outputs.into(),
            data: data.into(),
            policy: LoadPolicy::Strict,
            top_k: DEFAULT_TOP_K,
            chunking: ChunkConfig::default(),
            model,
            embedding_settings: EmbeddingSettings::default(),
            embeddings: OnceCell::new(),
        }
    }

    pub fn from_config(config: &RagbenchConfig, model: &'a dyn Completion) -> Self {
        let mut ctx = Self::new(config.outputs_dir.clone(), config.data_dir.clone(), model);
        ctx.policy = config.load_policy;
        ctx.top_k = config.top_k;
        ctx.chunking = config.chunking;
        ctx.embedding_settings = config.embedding.clone();
        ctx
    }

    pub fn with_policy(mut self, policy: LoadPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn model(&self) -> &dyn Completion {
        self.model
    }

    /// The embedding backend, created on first use.
    pub fn embeddings(&self) -> Result<&EmbeddingClient> {
        self.embeddings
            .get_or_try_init(|| EmbeddingClient::from_settings(&self.embedding_settings))
    }

    pub fn output(&self, name: &str) -> PathBuf {
        self.outputs.join(name)
    }

    pub fn data_file(&self, name: &str) -> PathBuf {
        self.data.join(name)
    }

    /// The task 4 benchmark, resolved through the configured load policy.
    pub fn ground_truth(&self) -> Result<GroundTruth> {
        Ok(load_json_with_policy(
            &self.output(TASK_4_JSON),
            "task 4",
            self.policy,
            GroundTruth::fallback,
        )?)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use anyhow::Result;
    use ragbench_rag::{synthesize_local_response, LlmResponse};

    pub fn local(prompt: &str) -> Result<LlmResponse> {
        Ok(LlmResponse::text(synthesize_local_response(prompt)))
    }

    pub fn fixed(content: &'static str) -> impl Fn(&str) -> Result<LlmResponse> + Send + Sync {
        move |_: &str| Ok(LlmResponse::text(content))
    }
}
