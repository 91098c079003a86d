//! Messages API boundary for the generation service.
//!
//! The [`MessagesClient`] trait decouples the research and review passes from
//! the HTTP transport. Tests use scripted clients that return predetermined
//! responses without touching the network.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::core::types::Usage;
use crate::io::config::DigestConfig;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
const API_VERSION: &str = "2023-06-01";
const ERROR_BODY_LIMIT: usize = 2_000;

/// Failure of a single request, classified for the retry layer.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("rate limited (HTTP 429): {message}")]
    RateLimited { message: String },

    #[error("server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("request rejected (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode response: {0}")]
    Decode(String),
}

impl CallError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            429 => CallError::RateLimited { message },
            500.. => CallError::Server { status, message },
            _ => CallError::Api { status, message },
        }
    }

    /// Rate limits and 5xx responses are transient; everything else is not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CallError::RateLimited { .. } | CallError::Server { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One content block. Kept as raw JSON so tool-use and search-result blocks
/// can be echoed back to the service unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentBlock(pub Value);

impl ContentBlock {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self(json!({ "type": "text", "text": text.into() }))
    }

    pub fn kind(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    /// Text of a `text` block; `None` for every other block type.
    pub fn as_text(&self) -> Option<&str> {
        if self.kind() != Some("text") {
            return None;
        }
        self.0.get("text").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// One conversation turn entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Blocks(blocks),
        }
    }

    pub fn assistant(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Blocks(blocks),
        }
    }
}

/// Why the service stopped producing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
    ToolUse,
    PauseTurn,
    Refusal,
    #[serde(other)]
    Other,
}

impl StopReason {
    /// The service paused mid-task and expects another turn.
    pub fn wants_continuation(self) -> bool {
        matches!(self, StopReason::ToolUse | StopReason::PauseTurn)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Value>,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub stop_reason: Option<StopReason>,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub usage: Usage,
}

impl MessageResponse {
    /// Concatenate every text block, in order.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect()
    }

    pub fn wants_continuation(&self) -> bool {
        self.stop_reason
            .is_some_and(StopReason::wants_continuation)
    }
}

/// Declaration of the server-side web search tool.
pub fn web_search_tool(max_uses: u32) -> Value {
    json!({
        "type": "web_search_20250305",
        "name": "web_search",
        "max_uses": max_uses,
    })
}

/// Abstraction over the generation service.
pub trait MessagesClient {
    /// Issue one request/response round trip.
    fn create_message(&self, request: &MessageRequest) -> Result<MessageResponse, CallError>;
}

/// Blocking HTTP client for the Anthropic Messages API.
pub struct AnthropicClient {
    http: reqwest::blocking::Client,
    api_key: String,
    endpoint: String,
}

impl AnthropicClient {
    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            api_key,
            endpoint: format!("{}/v1/messages", base_url.trim_end_matches('/')),
        })
    }

    /// Build a client from `ANTHROPIC_API_KEY`. Returns `Ok(None)` when the
    /// key is unset or blank.
    pub fn from_env(config: &DigestConfig) -> Result<Option<Self>> {
        let Some(api_key) = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
        else {
            return Ok(None);
        };
        Self::new(api_key, &config.api_base_url, config.request_timeout()).map(Some)
    }
}

impl MessagesClient for AnthropicClient {
    #[instrument(skip_all, fields(model = %request.model, messages = request.messages.len()))]
    fn create_message(&self, request: &MessageRequest) -> Result<MessageResponse, CallError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(request)
            .send()
            .map_err(|err| CallError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|err| CallError::Transport(err.to_string()))?;

        if !status.is_success() {
            debug!(status = status.as_u16(), "messages request failed");
            return Err(CallError::from_status(
                status.as_u16(),
                truncate(&body, ERROR_BODY_LIMIT),
            ));
        }

        let parsed: MessageResponse =
            serde_json::from_str(&body).map_err(|err| CallError::Decode(err.to_string()))?;
        debug!(
            stop_reason = ?parsed.stop_reason,
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            "messages request completed"
        );
        Ok(parsed)
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}… [truncated {} bytes]", &text[..end], text.len() - end)
}
