use anyhow::{anyhow, Result};
use serde_json::Value;

use ragbench_core::{Insight, InsightSet};
use ragbench_llm::{prompt_llm_json, Completion};

use crate::retrieval::ContextEntry;

const INSIGHT_FORMAT: &str = r#"{
    "insights": [
        {
            "insight": "<answer>",
            "justification": "<why the evidence supports the answer>",
            "citation": "<source_file or chunk_id>"
        }
    ]
}"#;

/// Three insights with justifications about a single passage.
pub fn passage_prompt(passage: &str) -> String {
    format!(
        r#"Analyze the following passage and extract exactly 3 key insights. For each insight, provide a brief justification based on the text.

Passage:
{passage}

Return ONLY a valid JSON object with two keys: "passage" holding the full text of the passage, and "insights" holding a list of exactly 3 objects, each with "insight" and "justification" keys.

The response should be in the following format:
{{
    "passage": "<the passage>",
    "insights": [
        {{
            "insight": "<the insight>",
            "justification": "<the justification for the insight>"
        }}
    ]
}}

Do not include any additional text, explanations, or formatting outside the JSON.
"#
    )
}

/// Cited insights for `query` from `"{chunk_id} ({source_file}): {text}"` evidence lines.
pub fn cited_prompt(query: &str, evidence: &[String]) -> String {
    let context: String = evidence.iter().map(|line| format!("- {line}\n")).collect();
    format!(
        r#"You are an analyst answering a research question based on retrieved evidence.
Generate at least three insights about the user query. Each insight must include a justification and a citation referencing the source file or chunk where the evidence came from.

User query:
{query}

Retrieved chunks:
{context}
Return the output as JSON with the format:
{INSIGHT_FORMAT}
"#
    )
}

/// Cited insights for `query` from numbered context entries.
pub fn context_prompt(query: &str, entries: &[ContextEntry]) -> String {
    let context: String = entries
        .iter()
        .map(|entry| format!("- {}\n", entry.formatted))
        .collect();
    format!(
        r#"You are an analyst answering a research question using retrieved evidence.
Generate at least three insights. Each insight must include an explanation (justification) and a citation pointing to the source_file or chunk_id.

Query:
{query}

Retrieved context:
{context}
Return a JSON object that looks like:
{INSIGHT_FORMAT}
"#
    )
}

/// Plain insight strings answering `query` from a knowledge base dump.
pub fn knowledge_prompt(query: &str, knowledge: &str) -> String {
    format!(
        r#"Based on the following knowledge base content, extract key insights that directly answer the user query: "{query}"

Knowledge Base:
{knowledge}

Provide a list of insights that are direct, quantitative, and relevant to the query. Return ONLY a valid JSON array of strings, each being a concise insight. Do not include any additional text, explanations, or formatting.
"#
    )
}

/// Sends an insight prompt and normalizes the reply.
pub fn generate_insights<M: Completion + ?Sized>(model: &M, prompt: &str) -> Result<InsightSet> {
    let value = prompt_llm_json(model, prompt)?;
    if !value.is_object() {
        return Err(anyhow!("expected a JSON object with insights, got {value}"));
    }
    Ok(InsightSet::from_value(&value))
}

/// Sends a knowledge prompt and returns the insight strings it lists.
pub fn predict_insight_strings<M: Completion + ?Sized>(
    model: &M,
    prompt: &str,
) -> Result<Vec<String>> {
    let value = prompt_llm_json(model, prompt)?;
    match value {
        Value::Array(items) => Ok(items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                object @ Value::Object(_) => Insight::from_value(&object).insight,
                other => other.to_string(),
            })
            .collect()),
        Value::Object(_) => Ok(InsightSet::from_value(&value).insight_texts()),
        other => Err(anyhow!("expected a JSON array of insights, got {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragbench_llm::{synthesize_local_response, LlmResponse};

    fn reply(content: &'static str) -> impl Fn(&str) -> Result<LlmResponse> + Send + Sync {
        move |_: &str| Ok(LlmResponse::text(content))
    }

    #[test]
    fn cited_prompt_lists_evidence_as_bullets() {
        let prompt = cited_prompt(
            "Which category wins?",
            &["c1 (sales.txt): Electronics lead.".to_string()],
        );
        assert!(prompt.contains("- c1 (sales.txt): Electronics lead.\n"));
        assert!(prompt.contains("\"citation\""));
    }

    #[test]
    fn generate_insights_recovers_from_prose() {
        let model = reply(
            r#"Here you go: {"insights": [{"insight": "A", "justification": "B", "citation": "c.txt"}]} hope it helps"#,
        );
        let set = generate_insights(&model, "prompt").unwrap();
        assert_eq!(set.insights.len(), 1);
        assert_eq!(set.insights[0].citation, "c.txt");
    }

    #[test]
    fn generate_insights_rejects_arrays() {
        let model = reply(r#"["A", "B"]"#);
        assert!(generate_insights(&model, "prompt").is_err());
    }

    #[test]
    fn predicted_strings_accept_arrays_and_objects() {
        let from_array = predict_insight_strings(&reply(r#"["A", {"insight": "B"}, 3]"#), "p")
            .unwrap();
        assert_eq!(from_array, vec!["A", "B", "3"]);
        let from_object =
            predict_insight_strings(&reply(r#"{"insights": [{"insight": "C"}]}"#), "p").unwrap();
        assert_eq!(from_object, vec!["C"]);
        assert!(predict_insight_strings(&reply("42"), "p").is_err());
    }

    #[test]
    fn prompts_drive_local_responder_shapes() {
        let local = |prompt: &str| -> Result<LlmResponse> {
            Ok(LlmResponse::text(synthesize_local_response(prompt)))
        };
        let passage = "Families decorate trees. Markets open early. Sales peak in December.";
        let set = generate_insights(&local, &passage_prompt(passage)).unwrap();
        assert_eq!(set.insights.len(), 3);
        assert_eq!(set.insights[0].insight, "Families decorate trees.");

        let knowledge = "User Query: q\n\nGroundtruth Answers:\n1. Alpha.\n2. Beta.\n";
        let strings = predict_insight_strings(&local, &knowledge_prompt("q", knowledge)).unwrap();
        assert_eq!(strings, vec!["Alpha.", "Beta."]);
    }
}
