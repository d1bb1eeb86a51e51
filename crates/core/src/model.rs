use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RagError, Result};

/// A unit of source text used as a retrieval candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    #[serde(default = "unknown_source")]
    pub source_file: String,
    pub text: String,
}

fn unknown_source() -> String {
    "unknown".to_string()
}

impl Chunk {
    pub fn new(
        chunk_id: impl Into<String>,
        source_file: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            source_file: source_file.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalResult {
    #[serde(default)]
    pub nearest_chunks: Vec<ScoredChunk>,
    #[serde(default)]
    pub furthest_chunks: Vec<ScoredChunk>,
}

const FALLBACK_QUERY: &str =
    "What product type delivers the highest profit-per-customer during Christmas sales?";

const FALLBACK_ANSWERS: [&str; 8] = [
    "Electronics show the highest 42 percent profit.",
    "Next category peaks at only 35 percent.",
    "Average category profit rises just 24 percent.",
    "Electronics exceed category average by 18 percent.",
    "Electronics beat runner-up category by 7 percent.",
    "Electronics generate 31 dollars more per customer.",
    "Electronics drive 14 percent greater holiday uplift.",
    "Electronics lead all segments in margin growth.",
];

/// The hand-authored benchmark every later stage is scored against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub user_query: String,
    pub groundtruth_answers: Vec<String>,
}

impl GroundTruth {
    /// The single default benchmark, used by task 4 and by the fallback load policy.
    pub fn fallback() -> Self {
        Self {
            user_query: FALLBACK_QUERY.to_string(),
            groundtruth_answers: FALLBACK_ANSWERS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn to_text(&self) -> String {
        let mut content = format!(
            "User Query: {}\n\nGroundtruth Answers:\n",
            self.user_query.trim()
        );
        for (i, answer) in self.groundtruth_answers.iter().enumerate() {
            content.push_str(&format!("{}. {}\n", i + 1, answer));
        }
        content
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(default)]
    pub insight: String,
    #[serde(default)]
    pub justification: String,
    #[serde(default)]
    pub citation: String,
}

impl Insight {
    /// Builds an insight from loosely shaped model output. Absent keys become
    /// empty strings and non-string values are rendered as JSON text.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(text) => Self {
                insight: text.clone(),
                ..Default::default()
            },
            _ => Self {
                insight: field_text(value, "insight"),
                justification: field_text(value, "justification"),
                citation: field_text(value, "citation"),
            },
        }
    }
}

fn field_text(value: &Value, key: &str) -> String {
    match value.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passage: Option<String>,
    #[serde(default)]
    pub insights: Vec<Insight>,
}

impl InsightSet {
    pub fn from_value(value: &Value) -> Self {
        let insights = value
            .get("insights")
            .and_then(|v| v.as_array())
            .map(|items| items.iter().map(Insight::from_value).collect())
            .unwrap_or_default();
        let passage = value
            .get("passage")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        Self { passage, insights }
    }

    pub fn insight_texts(&self) -> Vec<String> {
        self.insights.iter().map(|i| i.insight.clone()).collect()
    }
}

/// Recall judgement returned by the model in one of two accepted shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EvaluationReport {
    PerItem {
        individual_scores: Vec<f64>,
        overall_recall: f64,
        #[serde(default)]
        reasoning: String,
    },
    Overall {
        recall_score: f64,
        #[serde(default)]
        justification: String,
    },
}

impl EvaluationReport {
    pub fn from_value(value: Value) -> Result<Self> {
        let report: EvaluationReport = serde_json::from_value(value)
            .map_err(|err| RagError::InvalidReport(format!("unexpected shape: {err}")))?;
        report.validate()?;
        Ok(report)
    }

    pub fn recall(&self) -> f64 {
        match self {
            EvaluationReport::PerItem { overall_recall, .. } => *overall_recall,
            EvaluationReport::Overall { recall_score, .. } => *recall_score,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            EvaluationReport::PerItem {
                individual_scores,
                overall_recall,
                ..
            } => {
                for (idx, score) in individual_scores.iter().enumerate() {
                    check_unit("individual_scores", Some(idx), *score)?;
                }
                check_unit("overall_recall", None, *overall_recall)
            }
            EvaluationReport::Overall { recall_score, .. } => {
                check_unit("recall_score", None, *recall_score)
            }
        }
    }
}

fn check_unit(field: &str, idx: Option<usize>, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        return Ok(());
    }
    let label = match idx {
        Some(i) => format!("{field}[{i}]"),
        None => field.to_string(),
    };
    Err(RagError::InvalidReport(format!(
        "{label} = {value} is outside [0, 1]"
    )))
}
