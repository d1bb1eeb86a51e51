use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ragbench_core::{furthest, nearest, rank_chunks, ChunkStore, RetrievalResult, ScoredChunk};

use crate::embedding::EmbeddingClient;

pub const DEFAULT_TOP_K: usize = 3;

/// Nearest and furthest `k` chunks for an already encoded query.
pub fn retrieve(store: &ChunkStore, query_vector: &[f32], k: usize) -> RetrievalResult {
    let ranked = rank_chunks(query_vector, store);
    RetrievalResult {
        nearest_chunks: nearest(&ranked, k),
        furthest_chunks: furthest(&ranked, k),
    }
}

pub fn retrieve_for_query(
    store: &ChunkStore,
    embeddings: &EmbeddingClient,
    query: &str,
    k: usize,
) -> Result<RetrievalResult> {
    let query_vector = embeddings.embed(query)?;
    let result = retrieve(store, &query_vector, k);
    debug!(
        candidates = store.len(),
        nearest = result.nearest_chunks.len(),
        top_score = ?result.nearest_chunks.first().map(|c| c.score),
        "retrieved chunks"
    );
    Ok(result)
}

/// A retrieved chunk flattened for prompts and HTTP responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub chunk_id: String,
    pub source_file: String,
    pub text: String,
    pub score: f32,
    pub formatted: String,
}

pub fn format_context_entries(scored: &[ScoredChunk]) -> Vec<ContextEntry> {
    scored
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            let chunk = &entry.chunk;
            ContextEntry {
                chunk_id: chunk.chunk_id.clone(),
                source_file: chunk.source_file.clone(),
                text: chunk.text.clone(),
                score: entry.score,
                formatted: format!(
                    "{}. {} [{}]: {}",
                    idx + 1,
                    chunk.chunk_id,
                    chunk.source_file,
                    chunk.text
                ),
            }
        })
        .collect()
}

/// `"{chunk_id} ({source_file}): {text}"` lines for nearest then furthest chunks.
pub fn evidence_lines(result: &RetrievalResult, k: usize) -> Vec<String> {
    result
        .nearest_chunks
        .iter()
        .take(k)
        .chain(result.furthest_chunks.iter().take(k))
        .map(|entry| {
            format!(
                "{} ({}): {}",
                entry.chunk.chunk_id, entry.chunk.source_file, entry.chunk.text
            )
        })
        .collect()
}
