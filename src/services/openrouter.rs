// src/services/openrouter.rs
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "meta-llama/llama-3.2-3b-instruct:free";

/// Models the frontend offers, cheapest first.
pub const AVAILABLE_MODELS: [&str; 5] = [
    "meta-llama/llama-3.2-3b-instruct:free",
    "google/gemini-flash-1.5",
    "anthropic/claude-3-haiku",
    "anthropic/claude-3.5-sonnet",
    "perplexity/llama-3.1-sonar-large-128k-online",
];

/// Reads an explicit `null` the same as a missing field.
pub fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub api_key: String,
    pub base_url: String,
    /// Sent as HTTP-Referer for OpenRouter's app rankings
    pub site_url: String,
    /// Sent as X-Title
    pub site_name: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage { role: "user".to_string(), content: content.into() }
    }
}

/// Chat-completion request body. The model is chosen per request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

impl ChatResponse {
    pub fn first_message(&self) -> Option<&ResponseMessage> {
        self.choices.first().map(|c| &c.message)
    }

    pub fn first_content(&self) -> Option<&str> {
        self.first_message()
            .and_then(|m| m.content.as_deref())
            .filter(|c| !c.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCall {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub arguments: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
}

/// What came back from one chat call, whatever the status.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub status: StatusCode,
    pub response: ChatResponse,
    pub raw: Value,
}

pub struct OpenRouterClient {
    client: Client,
    config: RelayConfig,
}

impl OpenRouterClient {
    pub fn new(config: RelayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create OpenRouter HTTP client")?;

        Ok(OpenRouterClient { client, config })
    }

    /// Send a request and hand back status and body without judging either.
    pub async fn send_chat(&self, request: &ChatRequest) -> Result<ChatOutcome> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        info!("Calling OpenRouter model {}", request.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .header("HTTP-Referer", &self.config.site_url)
            .header("X-Title", &self.config.site_name)
            .json(request)
            .send()
            .await
            .context("OpenRouter request failed")?;

        let status = response.status();
        let text = response.text().await.context("Failed to read OpenRouter response")?;
        let raw: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));
        let parsed = match serde_json::from_value::<ChatResponse>(raw.clone()) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Unexpected OpenRouter response shape ({}): {}", status, e);
                ChatResponse::default()
            }
        };
        debug!("OpenRouter answered {} for model {}", status, request.model);

        Ok(ChatOutcome { status, response: parsed, raw })
    }

    /// Send a request and return the first message content, failing on non-2xx or empty answers.
    pub async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let outcome = self.send_chat(request).await?;
        if !outcome.status.is_success() {
            error!("OpenRouter API error: {} - {}", outcome.status, outcome.raw);
            anyhow::bail!("OpenRouter API failed: {}", outcome.status.as_u16());
        }

        let content = outcome
            .response
            .first_content()
            .context("No content in OpenRouter response")?
            .to_string();
        info!("OpenRouter response received ({} characters)", content.len());
        Ok(content)
    }
}

/// Pull a JSON object out of model output that may be wrapped in prose or code fences.
pub fn extract_json(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
        return Some(value);
    }

    let fences = Regex::new(r"```(?:json)?\s*").ok()?;
    let unfenced = fences.replace_all(text, "");
    if let Ok(value) = serde_json::from_str::<Value>(unfenced.trim()) {
        return Some(value);
    }

    let object = Regex::new(r"(?s)\{.*\}").ok()?;
    let span = object.find(&unfenced)?;
    serde_json::from_str(span.as_str()).ok()
}
