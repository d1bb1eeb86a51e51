use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use ragbench_core::EvaluationReport;
use ragbench_llm::{prompt_llm_json, Completion};

/// Which judgement shape the evaluator is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecallVariant {
    /// One score per ground truth answer plus their mean.
    PerItem,
    /// A single recall fraction with a justification.
    Overall,
}

pub fn evaluation_prompt(
    variant: RecallVariant,
    query: &str,
    truth: &[String],
    predicted: &[String],
) -> Result<String> {
    let truth_json = serde_json::to_string_pretty(truth)?;
    let predicted_json = serde_json::to_string_pretty(predicted)?;
    let instructions = match variant {
        RecallVariant::PerItem => {
            r#"For each ground truth answer, score from 0 to 1 how well it is covered by any of the predicted insights (1 = fully covered, 0 = not covered at all). Then report overall_recall as the mean of those scores.

Return ONLY a valid JSON object in the following format:
{
    "individual_scores": [<score for answer 1>, <score for answer 2>, ...],
    "overall_recall": <mean score>,
    "reasoning": "<short explanation>"
}"#
        }
        RecallVariant::Overall => {
            r#"Recall is the fraction of ground truth answers that are captured by at least one predicted insight. Report it as a number between 0 and 1.

Return ONLY a valid JSON object in the following format:
{
    "recall_score": <number between 0 and 1>,
    "justification": "<short explanation>"
}"#
        }
    };
    Ok(format!(
        "You are an evaluator comparing predicted insights against ground truth answers for the query: \"{query}\"\n\nGround Truth Answers:\n{truth_json}\n\nPredicted Insights:\n{predicted_json}\n\n{instructions}\n\nDo not include any additional text outside the JSON.\n"
    ))
}

/// Asks the model to judge recall and validates the returned report.
pub fn score_recall<M: Completion + ?Sized>(
    model: &M,
    variant: RecallVariant,
    query: &str,
    truth: &[String],
    predicted: &[String],
) -> Result<EvaluationReport> {
    let prompt = evaluation_prompt(variant, query, truth, predicted)?;
    let value = prompt_llm_json(model, &prompt)?;
    let report = EvaluationReport::from_value(value)?;
    info!(
        variant = ?variant,
        truth = truth.len(),
        predicted = predicted.len(),
        recall = report.recall(),
        "recall evaluated"
    );
    Ok(report)
}
