mod local;
mod reply;

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::env;
use tokio::runtime::Runtime;
use tracing::debug;

pub use local::synthesize_local_response;
pub use reply::{parse_reply, prompt_llm, prompt_llm_json, ParsedReply, ReplyError};

pub const DEFAULT_MODEL: &str = "deepseek-ai/DeepSeek-V3.1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Together,
    OpenAi,
    Deepseek,
    Local,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Together => "together",
            LlmProvider::OpenAi => "openai",
            LlmProvider::Deepseek => "deepseek",
            LlmProvider::Local => "local",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "together" => Some(LlmProvider::Together),
            "openai" => Some(LlmProvider::OpenAi),
            "deepseek" => Some(LlmProvider::Deepseek),
            "local" => Some(LlmProvider::Local),
            _ => None,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Together => DEFAULT_MODEL,
            LlmProvider::OpenAi => "gpt-4.1-mini",
            LlmProvider::Deepseek => "deepseek-chat",
            LlmProvider::Local => "local",
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            LlmProvider::Together => "https://api.together.xyz/v1",
            LlmProvider::OpenAi => "https://api.openai.com/v1",
            LlmProvider::Deepseek => "https://api.deepseek.com/v1",
            LlmProvider::Local => "",
        }
    }

    fn key_var(&self) -> Option<&'static str> {
        match self {
            LlmProvider::Together => Some("TOGETHER_API_KEY"),
            LlmProvider::OpenAi => Some("OPENAI_API_KEY"),
            LlmProvider::Deepseek => Some("DEEPSEEK_API_KEY"),
            LlmProvider::Local => None,
        }
    }

    fn base_url_var(&self) -> Option<&'static str> {
        match self {
            LlmProvider::Together => Some("TOGETHER_BASE_URL"),
            LlmProvider::OpenAi => Some("OPENAI_BASE_URL"),
            LlmProvider::Deepseek => Some("DEEPSEEK_BASE_URL"),
            LlmProvider::Local => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LlmRequest {
    pub user: String,
}

#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl LlmResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            prompt_tokens: 0,
            completion_tokens: 0,
        }
    }

    pub fn total_tokens(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

/// Anything that can answer a single user prompt.
pub trait Completion: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<LlmResponse>;
}

impl<F> Completion for F
where
    F: Fn(&str) -> Result<LlmResponse> + Send + Sync,
{
    fn complete(&self, prompt: &str) -> Result<LlmResponse> {
        self(prompt)
    }
}

#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    provider: LlmProvider,
    model: String,
    config: ProviderConfig,
}

#[derive(Clone)]
enum ProviderConfig {
    Remote(RemoteConfig),
    Local,
}

#[derive(Clone)]
struct RemoteConfig {
    api_key: String,
    base_url: String,
}

impl LlmClient {
    pub fn new(provider: LlmProvider, model: impl Into<String>) -> Result<Self> {
        let config = match (provider.key_var(), provider.base_url_var()) {
            (Some(key_var), Some(url_var)) => ProviderConfig::Remote(RemoteConfig {
                api_key: read_api_key(key_var)?,
                base_url: env::var(url_var)
                    .unwrap_or_else(|_| provider.default_base_url().to_string()),
            }),
            _ => ProviderConfig::Local,
        };
        Ok(Self {
            http: http_client(),
            provider,
            model: model.into(),
            config,
        })
    }

    pub fn local() -> Self {
        Self {
            http: http_client(),
            provider: LlmProvider::Local,
            model: LlmProvider::Local.default_model().to_string(),
            config: ProviderConfig::Local,
        }
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn chat(&self, req: &LlmRequest) -> Result<LlmResponse> {
        match &self.config {
            ProviderConfig::Remote(cfg) => self.chat_completions(cfg, req).await,
            ProviderConfig::Local => Ok(LlmResponse::text(synthesize_local_response(&req.user))),
        }
    }

    pub fn chat_blocking(&self, req: &LlmRequest) -> Result<LlmResponse> {
        let rt = Runtime::new().context("failed to create tokio runtime")?;
        rt.block_on(self.chat(req))
    }

    async fn chat_completions(&self, cfg: &RemoteConfig, req: &LlmRequest) -> Result<LlmResponse> {
        let url = format!("{}/chat/completions", cfg.base_url.trim_end_matches('/'));
        let payload = json!({
            "model": self.model,
            "messages": [ { "role": "user", "content": req.user } ],
        });
        debug!(provider = self.provider.as_str(), model = %self.model, "sending chat completion");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&cfg.api_key)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("{} request failed", self.provider.as_str()))?;
        let value = decode_body(self.provider, response).await?;
        let content = extract_message_text(&value).ok_or_else(|| {
            anyhow!(
                "missing text in {} response",
                self.provider.as_str()
            )
        })?;
        let usage: ChatUsage = value
            .get("usage")
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default();
        Ok(LlmResponse {
            content,
            prompt_tokens: usage.prompt_tokens.unwrap_or(0),
            completion_tokens: usage.completion_tokens.unwrap_or(0),
        })
    }
}

impl Completion for LlmClient {
    fn complete(&self, prompt: &str) -> Result<LlmResponse> {
        self.chat_blocking(&LlmRequest {
            user: prompt.to_string(),
        })
    }
}

async fn decode_body(provider: LlmProvider, response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(anyhow!(
            "{} returned error (status {}): {}",
            provider.as_str(),
            status,
            body
        ));
    }
    serde_json::from_str(&body)
        .with_context(|| format!("failed to decode {} response", provider.as_str()))
}

// Each blocking call runs on its own runtime, so pooled connections would
// outlive the runtime that opened them.
fn http_client() -> Client {
    Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap_or_else(|_| Client::new())
}

fn read_api_key(var: &str) -> Result<String> {
    let value = env::var(var).map_err(|_| anyhow!("{var} is not set"))?;
    validate_api_key(var, &value)?;
    Ok(value)
}

fn validate_api_key(var: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(anyhow!("{var} is empty"));
    }
    if (var.contains("OPENAI") || var.contains("DEEPSEEK")) && !value.starts_with("sk-") {
        return Err(anyhow!("{var} must start with 'sk-'"));
    }
    Ok(())
}

/// Text of the first choice, whether `content` is a string or a list of parts.
fn extract_message_text(value: &Value) -> Option<String> {
    let choice = value.get("choices")?.as_array()?.first()?;
    if let Some(text) = choice.get("text").and_then(|t| t.as_str()) {
        return Some(text.to_string());
    }
    let content = choice.get("message")?.get("content")?;
    if let Some(text) = content.as_str() {
        return Some(text.to_string());
    }
    content
        .as_array()?
        .iter()
        .find_map(|part| part.get("text").and_then(|t| t.as_str()))
        .map(|text| text.to_string())
}

#[derive(Default, Deserialize)]
struct ChatUsage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names_roundtrip() {
        for provider in [
            LlmProvider::Together,
            LlmProvider::OpenAi,
            LlmProvider::Deepseek,
            LlmProvider::Local,
        ] {
            assert_eq!(LlmProvider::from_str(provider.as_str()), Some(provider));
        }
        assert_eq!(LlmProvider::from_str(" Together "), Some(LlmProvider::Together));
        assert!(LlmProvider::from_str("gemini").is_none());
        assert_eq!(LlmProvider::Together.default_model(), DEFAULT_MODEL);
    }

    #[test]
    fn first_choice_text_is_extracted() {
        let value = json!({
            "choices": [
                {"message": {"role": "assistant", "content": "first"}},
                {"message": {"role": "assistant", "content": "second"}}
            ]
        });
        assert_eq!(extract_message_text(&value).as_deref(), Some("first"));

        let parts = json!({
            "choices": [{"message": {"content": [{"type": "text", "text": "part"}]}}]
        });
        assert_eq!(extract_message_text(&parts).as_deref(), Some("part"));
        assert!(extract_message_text(&json!({"choices": []})).is_none());
    }

    #[test]
    fn api_keys_are_checked_per_provider() {
        assert!(validate_api_key("OPENAI_API_KEY", "sk-abc").is_ok());
        assert!(validate_api_key("OPENAI_API_KEY", "abc").is_err());
        assert!(validate_api_key("TOGETHER_API_KEY", "tgp_v1_abc").is_ok());
        assert!(validate_api_key("TOGETHER_API_KEY", "  ").is_err());
    }

    #[test]
    fn local_client_answers_without_network() {
        let client = LlmClient::new(LlmProvider::Local, "local").unwrap();
        let response = client.complete("Say something about the holidays.").unwrap();
        assert!(!response.content.is_empty());
        assert_eq!(response.total_tokens(), 0);
    }
}
