mod chunk;
mod embedding;
mod error;
mod model;
mod persist;
mod similarity;
mod store;

pub use chunk::{ChunkConfig, Chunker};
pub use embedding::{HashEmbedder, HashEmbedderConfig};
pub use error::{RagError, Result};
pub use model::{
    Chunk, EvaluationReport, GroundTruth, Insight, InsightSet, RetrievalResult, ScoredChunk,
};
pub use persist::{load_json, load_json_with_policy, load_txt, save_json, save_txt, LoadPolicy};
pub use similarity::{cosine_similarity, furthest, nearest, rank, rank_chunks};
pub use store::{ChunkStore, StorePaths};
