use std::path::PathBuf;

use tracing::debug;

use crate::error::{RagError, Result};
use crate::model::Chunk;
use crate::persist::load_json;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub chunks: PathBuf,
    pub embeddings: PathBuf,
    /// Step to name in the error when either file is absent.
    pub upstream: String,
}

impl StorePaths {
    pub fn new(
        chunks: impl Into<PathBuf>,
        embeddings: impl Into<PathBuf>,
        upstream: impl Into<String>,
    ) -> Self {
        Self {
            chunks: chunks.into(),
            embeddings: embeddings.into(),
            upstream: upstream.into(),
        }
    }
}

/// Chunk records and their embeddings, aligned by index.
#[derive(Debug, Clone, Default)]
pub struct ChunkStore {
    chunks: Vec<Chunk>,
    embeddings: Vec<Vec<f32>>,
}

impl ChunkStore {
    pub fn new(chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>) -> Result<Self> {
        if chunks.len() != embeddings.len() {
            return Err(RagError::CorruptInput(format!(
                "chunk metadata count ({}) does not match embeddings ({})",
                chunks.len(),
                embeddings.len()
            )));
        }
        if let Some(idx) = embeddings
            .iter()
            .position(|vector| vector.iter().any(|v| !v.is_finite()))
        {
            return Err(RagError::CorruptInput(format!(
                "embedding {idx} ({}) has a non-finite component",
                chunks[idx].chunk_id
            )));
        }
        Ok(Self { chunks, embeddings })
    }

    pub fn load(paths: &StorePaths) -> Result<Self> {
        for path in [&paths.chunks, &paths.embeddings] {
            if !path.exists() {
                return Err(RagError::missing(path.as_path(), paths.upstream.as_str()));
            }
        }
        let chunks: Vec<Chunk> = load_json(&paths.chunks, &paths.upstream)?;
        let embeddings: Vec<Vec<f32>> = load_json(&paths.embeddings, &paths.upstream)?;
        let store = Self::new(chunks, embeddings)?;
        debug!(
            chunks = store.len(),
            path = %paths.chunks.display(),
            "loaded chunk store"
        );
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn embeddings(&self) -> &[Vec<f32>] {
        &self.embeddings
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&Chunk, &[f32])> {
        self.chunks
            .iter()
            .zip(self.embeddings.iter().map(|v| v.as_slice()))
    }

    pub fn into_parts(self) -> (Vec<Chunk>, Vec<Vec<f32>>) {
        (self.chunks, self.embeddings)
    }
}
