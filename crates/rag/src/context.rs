use std::sync::Arc;

use anyhow::{anyhow, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use ragbench_core::{ChunkStore, Insight, StorePaths};
use ragbench_llm::Completion;

use crate::embedding::EmbeddingClient;
use crate::insights::{context_prompt, generate_insights};
use crate::retrieval::{format_context_entries, retrieve_for_query, ContextEntry};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub insights: Vec<Insight>,
    pub retrieved_chunks: Vec<ContextEntry>,
}

/// What the query service appends to its log file for each answered query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRecord {
    pub query: String,
    pub retrieved_chunks: Vec<ContextEntry>,
    pub insights: Vec<Insight>,
}

impl QueryRecord {
    pub fn new(query: impl Into<String>, answer: &QueryAnswer) -> Self {
        Self {
            query: query.into(),
            retrieved_chunks: answer.retrieved_chunks.clone(),
            insights: answer.insights.clone(),
        }
    }
}

/// Long-lived state for answering free-form queries against a loaded chunk store.
pub struct QueryContext {
    paths: StorePaths,
    store: RwLock<Arc<ChunkStore>>,
    embeddings: EmbeddingClient,
    model: Arc<dyn Completion>,
    top_k: usize,
}

impl QueryContext {
    pub fn load(
        paths: StorePaths,
        embeddings: EmbeddingClient,
        model: Arc<dyn Completion>,
        top_k: usize,
    ) -> Result<Self> {
        let store = ChunkStore::load(&paths)?;
        info!(
            chunks = store.len(),
            embeddings = embeddings.backend_name(),
            top_k,
            "query context loaded"
        );
        Ok(Self::from_store(paths, store, embeddings, model, top_k))
    }

    pub fn from_store(
        paths: StorePaths,
        store: ChunkStore,
        embeddings: EmbeddingClient,
        model: Arc<dyn Completion>,
        top_k: usize,
    ) -> Self {
        Self {
            paths,
            store: RwLock::new(Arc::new(store)),
            embeddings,
            model,
            top_k,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.store.read().len()
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Re-reads chunk metadata and embeddings from disk. The previous store
    /// stays in place when loading fails.
    pub fn reload(&self) -> Result<usize> {
        let fresh = ChunkStore::load(&self.paths)?;
        let count = fresh.len();
        *self.store.write() = Arc::new(fresh);
        info!(chunks = count, "query context reloaded");
        Ok(count)
    }

    pub fn answer(&self, query: &str) -> Result<QueryAnswer> {
        let query = query.trim();
        if query.is_empty() {
            return Err(anyhow!("query must not be empty"));
        }
        let store = Arc::clone(&self.store.read());
        let result = retrieve_for_query(&store, &self.embeddings, query, self.top_k)?;
        let retrieved_chunks = format_context_entries(&result.nearest_chunks);
        let prompt = context_prompt(query, &retrieved_chunks);
        let set = generate_insights(self.model.as_ref(), &prompt)?;
        debug!(
            retrieved = retrieved_chunks.len(),
            insights = set.insights.len(),
            "query answered"
        );
        Ok(QueryAnswer {
            insights: set.insights,
            retrieved_chunks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragbench_core::{save_json, Chunk};
    use ragbench_llm::{synthesize_local_response, LlmResponse};
    use tempfile::tempdir;

    fn write_store(dir: &std::path::Path, chunks: &[Chunk]) -> StorePaths {
        let embedder = EmbeddingClient::hash();
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed_batch(&texts).unwrap();
        let paths = StorePaths::new(
            dir.join("task_8_chunks.json"),
            dir.join("task_8_embeddings.json"),
            "task 8",
        );
        save_json(chunks, &paths.chunks).unwrap();
        save_json(&vectors, &paths.embeddings).unwrap();
        paths
    }

    fn local_model() -> Arc<dyn Completion> {
        Arc::new(|prompt: &str| -> Result<LlmResponse> {
            Ok(LlmResponse::text(synthesize_local_response(prompt)))
        })
    }

    #[test]
    fn answer_cites_retrieved_sources() {
        let dir = tempdir().unwrap();
        let paths = write_store(
            dir.path(),
            &[
                Chunk::new("sales_chunk_000", "sales.txt", "Electronics lead holiday profit."),
                Chunk::new("snow_chunk_000", "weather.txt", "Snow covered the town square."),
            ],
        );
        let ctx = QueryContext::load(paths, EmbeddingClient::hash(), local_model(), 1).unwrap();
        let answer = ctx.answer("  Which electronics lead holiday profit?  ").unwrap();
        assert_eq!(answer.retrieved_chunks.len(), 1);
        assert_eq!(answer.retrieved_chunks[0].chunk_id, "sales_chunk_000");
        assert_eq!(answer.insights[0].citation, "sales.txt");
    }

    #[test]
    fn blank_query_is_rejected() {
        let ctx = QueryContext::from_store(
            StorePaths::new("c.json", "e.json", "task 8"),
            ChunkStore::default(),
            EmbeddingClient::hash(),
            local_model(),
            3,
        );
        assert!(ctx.answer("   ").is_err());
    }

    #[test]
    fn reload_picks_up_new_chunks_and_keeps_old_on_failure() {
        let dir = tempdir().unwrap();
        let paths = write_store(dir.path(), &[Chunk::new("a", "a.txt", "Alpha text.")]);
        let ctx =
            QueryContext::load(paths.clone(), EmbeddingClient::hash(), local_model(), 3).unwrap();
        assert_eq!(ctx.chunk_count(), 1);

        write_store(
            dir.path(),
            &[
                Chunk::new("a", "a.txt", "Alpha text."),
                Chunk::new("b", "b.txt", "Beta text."),
            ],
        );
        assert_eq!(ctx.reload().unwrap(), 2);

        std::fs::remove_file(&paths.embeddings).unwrap();
        assert!(ctx.reload().is_err());
        assert_eq!(ctx.chunk_count(), 2);
    }

    #[test]
    fn model_failure_surfaces_as_error() {
        let failing: Arc<dyn Completion> =
            Arc::new(|_: &str| -> Result<LlmResponse> { Err(anyhow!("upstream unavailable")) });
        let ctx = QueryContext::from_store(
            StorePaths::new("c.json", "e.json", "task 8"),
            ChunkStore::new(vec![Chunk::new("a", "a.txt", "Alpha.")], vec![vec![1.0]]).unwrap(),
            EmbeddingClient::hash(),
            failing,
            3,
        );
        let err = ctx.answer("alpha").unwrap_err();
        assert!(err.to_string().contains("upstream unavailable"));
    }
}
