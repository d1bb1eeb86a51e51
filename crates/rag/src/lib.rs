pub mod context;
pub mod embedding;
pub mod evaluation;
pub mod insights;
pub mod retrieval;

pub use context::{QueryAnswer, QueryContext, QueryRecord};
pub use embedding::{EmbeddingBackend, EmbeddingClient, EmbeddingSettings};
pub use evaluation::{evaluation_prompt, score_recall, RecallVariant};
pub use insights::{
    cited_prompt, context_prompt, generate_insights, knowledge_prompt, passage_prompt,
    predict_insight_strings,
};
pub use retrieval::{
    evidence_lines, format_context_entries, retrieve, retrieve_for_query, ContextEntry,
    DEFAULT_TOP_K,
};
pub use ragbench_llm::{
    prompt_llm, prompt_llm_json, synthesize_local_response, Completion, LlmClient, LlmProvider,
    LlmRequest, LlmResponse,
};
