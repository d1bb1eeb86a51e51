use anyhow::Result;
use clap::ValueEnum;
use serde_json::Value;
use tracing::info;

use ragbench_core::{load_json, load_txt, save_json, save_txt, GroundTruth, Insight, RagError};
use ragbench_rag::{knowledge_prompt, predict_insight_strings, score_recall, RecallVariant};

use super::{TaskContext, TASK_4_JSON, TASK_4_TEXT, TASK_5_INSIGHTS, TASK_5_NEEDLE, TASK_6_REPORT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Task6Mode {
    Predict,
    Evaluate,
}

pub fn task_4(ctx: &TaskContext) -> Result<()> {
    let truth = GroundTruth::fallback();
    let json_path = ctx.output(TASK_4_JSON);
    let text_path = ctx.output(TASK_4_TEXT);
    save_json(&truth, &json_path)?;
    save_txt(&truth.to_text(), &text_path)?;
    info!(
        answers = truth.groundtruth_answers.len(),
        json = %json_path.display(),
        text = %text_path.display(),
        "task 4 finished"
    );
    Ok(())
}

/// Writes the ground truth as a plain-text knowledge base.
pub fn task_5(ctx: &TaskContext) -> Result<()> {
    let truth = ctx.ground_truth()?;
    let path = ctx.output(TASK_5_NEEDLE);
    save_txt(&truth.to_text(), &path)?;
    info!(output = %path.display(), "task 5 finished");
    Ok(())
}

pub fn task_6(ctx: &TaskContext, mode: Task6Mode) -> Result<()> {
    match mode {
        Task6Mode::Predict => predict(ctx),
        Task6Mode::Evaluate => evaluate(ctx),
    }
}

fn predict(ctx: &TaskContext) -> Result<()> {
    let truth = ctx.ground_truth()?;
    let needle_path = ctx.output(TASK_5_NEEDLE);
    if !needle_path.exists() {
        return Err(RagError::missing(&needle_path, "task 5").into());
    }
    let knowledge = load_txt(&needle_path)?;
    let prompt = knowledge_prompt(&truth.user_query, &knowledge);
    let insights = predict_insight_strings(ctx.model(), &prompt)?;
    let path = ctx.output(TASK_5_INSIGHTS);
    save_json(&insights, &path)?;
    info!(output = %path.display(), insights = insights.len(), "task 6 predict finished");
    Ok(())
}

fn evaluate(ctx: &TaskContext) -> Result<()> {
    let truth = ctx.ground_truth()?;
    let raw: Vec<Value> = load_json(&ctx.output(TASK_5_INSIGHTS), "task 6 --mode predict")?;
    let predicted: Vec<String> = raw.iter().map(|v| Insight::from_value(v).insight).collect();
    let report = score_recall(
        ctx.model(),
        RecallVariant::PerItem,
        &truth.user_query,
        &truth.groundtruth_answers,
        &predicted,
    )?;
    let path = ctx.output(TASK_6_REPORT);
    save_json(&report, &path)?;
    info!(output = %path.display(), recall = report.recall(), "task 6 evaluate finished");
    Ok(())
}
