use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::runtime::Runtime;
use tracing::info;

use ragbench_core::StorePaths;
use ragbench_rag::{Completion, QueryContext};
use ragbench_service::{serve, AppState, QUERY_LOG_FILE};

use crate::config::RagbenchConfig;
use crate::tasks::{TASK_8_CHUNKS, TASK_8_EMBEDDINGS};

/// Task 11: answers free-form queries over HTTP against the task 8 store.
pub fn run(config: &RagbenchConfig, bind: Option<String>) -> Result<()> {
    let state = build_state(config, Arc::new(config.llm_client()?))?;
    let addr = match bind {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("invalid bind address {raw}"))?,
        None => config.socket_addr()?,
    };
    info!(
        chunks = state.context().chunk_count(),
        top_k = state.context().top_k(),
        "starting query service"
    );
    let runtime = Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(serve(addr, Arc::new(state)))
}

pub fn build_state(config: &RagbenchConfig, model: Arc<dyn Completion>) -> Result<AppState> {
    let outputs = &config.outputs_dir;
    let paths = StorePaths::new(
        outputs.join(TASK_8_CHUNKS),
        outputs.join(TASK_8_EMBEDDINGS),
        "task 8",
    );
    let ctx = QueryContext::load(paths, config.embedding_client()?, model, config.top_k)?;
    Ok(AppState::new(ctx, outputs.join(QUERY_LOG_FILE)))
}
