use anyhow::{anyhow, Result};
use tracing::{debug, info};

use ragbench_core::{
    load_json, save_json, save_txt, Chunk, ChunkStore, Chunker, EvaluationReport, GroundTruth,
    InsightSet, RetrievalResult, StorePaths,
};
use ragbench_rag::{
    cited_prompt, evidence_lines, generate_insights, retrieve_for_query, score_recall,
    RecallVariant,
};

use super::{
    TaskContext, TASK_10_PREDICTION, TASK_10_REPORT, TASK_10_TEXT, TASK_7_CHUNKS, TASK_8_CHUNKS,
    TASK_8_EMBEDDINGS, TASK_9_RETRIEVAL,
};

/// Splits every text document in the data directory into chunks.
pub fn task_7(ctx: &TaskContext) -> Result<()> {
    let chunks = Chunker::new(ctx.chunking).chunk_dir(&ctx.data)?;
    if chunks.is_empty() {
        return Err(anyhow!(
            "no text documents with content found under {}",
            ctx.data.display()
        ));
    }
    let path = ctx.output(TASK_7_CHUNKS);
    save_json(&chunks, &path)?;
    info!(output = %path.display(), chunks = chunks.len(), "task 7 finished");
    Ok(())
}

pub fn task_8(ctx: &TaskContext) -> Result<()> {
    let chunks: Vec<Chunk> = load_json(&ctx.output(TASK_7_CHUNKS), "task 7")?;
    let embeddings = ctx.embeddings()?;
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embeddings.embed_batch(&texts)?;
    let store = ChunkStore::new(chunks, vectors)?;
    let paths = store_paths(ctx);
    let (chunks, vectors) = store.into_parts();
    save_json(&chunks, &paths.chunks)?;
    save_json(&vectors, &paths.embeddings)?;
    info!(
        chunks = chunks.len(),
        backend = embeddings.backend_name(),
        dimensions = vectors.first().map(Vec::len).unwrap_or(0),
        output = %paths.embeddings.display(),
        "task 8 finished"
    );
    Ok(())
}

/// Ranks the stored chunks against the ground-truth query.
pub fn task_9(ctx: &TaskContext) -> Result<()> {
    let truth = ctx.ground_truth()?;
    let store = ChunkStore::load(&store_paths(ctx))?;
    let result = retrieve_for_query(&store, ctx.embeddings()?, &truth.user_query, ctx.top_k)?;
    let path = ctx.output(TASK_9_RETRIEVAL);
    save_json(&result, &path)?;
    info!(
        output = %path.display(),
        nearest = result.nearest_chunks.len(),
        furthest = result.furthest_chunks.len(),
        "task 9 finished"
    );
    Ok(())
}

/// Cited insights from the retrieved evidence, judged against the ground truth.
pub fn task_10(ctx: &TaskContext) -> Result<()> {
    let truth = ctx.ground_truth()?;
    let retrieval: RetrievalResult = load_json(&ctx.output(TASK_9_RETRIEVAL), "task 9")?;
    let evidence = evidence_lines(&retrieval, ctx.top_k);
    debug!(evidence = evidence.len(), "prompting for cited insights");
    let prompt = cited_prompt(&truth.user_query, &evidence);
    let prediction = generate_insights(ctx.model(), &prompt)?;
    let report = score_recall(
        ctx.model(),
        RecallVariant::Overall,
        &truth.user_query,
        &truth.groundtruth_answers,
        &prediction.insight_texts(),
    )?;
    save_json(&prediction, &ctx.output(TASK_10_PREDICTION))?;
    save_json(&report, &ctx.output(TASK_10_REPORT))?;
    let text_path = ctx.output(TASK_10_TEXT);
    save_txt(&render_answer(&truth, &prediction, &report), &text_path)?;
    info!(
        insights = prediction.insights.len(),
        recall = report.recall(),
        output = %text_path.display(),
        "task 10 finished"
    );
    Ok(())
}

fn store_paths(ctx: &TaskContext) -> StorePaths {
    StorePaths::new(
        ctx.output(TASK_8_CHUNKS),
        ctx.output(TASK_8_EMBEDDINGS),
        "task 8",
    )
}

fn render_answer(
    truth: &GroundTruth,
    prediction: &InsightSet,
    report: &EvaluationReport,
) -> String {
    let mut out = format!("User Query: {}\n\nInsights:\n", truth.user_query.trim());
    for (idx, insight) in prediction.insights.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", idx + 1, insight.insight));
        if !insight.justification.is_empty() {
            out.push_str(&format!("   Justification: {}\n", insight.justification));
        }
        if !insight.citation.is_empty() {
            out.push_str(&format!("   Citation: {}\n", insight.citation));
        }
    }
    let explanation = match report {
        EvaluationReport::Overall { justification, .. } => justification,
        EvaluationReport::PerItem { reasoning, .. } => reasoning,
    };
    out.push_str(&format!("\nRecall: {:.2}\n", report.recall()));
    if !explanation.is_empty() {
        out.push_str(&format!("{explanation}\n"));
    }
    out
}
