use anyhow::Result;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::Completion;

/// Outcome of reading a model reply as JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedReply {
    Parsed(Value),
    Unparseable(String),
}

impl ParsedReply {
    pub fn into_result(self) -> std::result::Result<Value, ReplyError> {
        match self {
            ParsedReply::Parsed(value) => Ok(value),
            ParsedReply::Unparseable(raw) => Err(ReplyError::Unparseable(raw)),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("model did not return parseable JSON: {0}")]
    Unparseable(String),
}

/// Parses the whole reply first (optionally wrapped in a markdown fence), then
/// falls back to the first balanced `{...}` object in the text.
pub fn parse_reply(raw: &str) -> ParsedReply {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str::<Value>(strip_fence(trimmed)) {
        return ParsedReply::Parsed(value);
    }
    if let Some(candidate) = first_balanced_object(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            warn!(
                reply_chars = trimmed.len(),
                object_chars = candidate.len(),
                "recovered JSON object from surrounding prose"
            );
            return ParsedReply::Parsed(value);
        }
    }
    ParsedReply::Unparseable(raw.to_string())
}

fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return text;
    };
    let body = body.strip_prefix("json").unwrap_or(body);
    body.trim()
}

fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Sends `prompt` as a single user message and returns the reply text.
pub fn prompt_llm<M: Completion + ?Sized>(model: &M, prompt: &str) -> Result<String> {
    let response = model.complete(prompt)?;
    debug!(
        prompt_tokens = response.prompt_tokens,
        completion_tokens = response.completion_tokens,
        "model replied"
    );
    Ok(response.content)
}

/// Like [`prompt_llm`], but the reply must contain JSON.
pub fn prompt_llm_json<M: Completion + ?Sized>(model: &M, prompt: &str) -> Result<Value> {
    let content = prompt_llm(model, prompt)?;
    Ok(parse_reply(&content).into_result()?)
}
