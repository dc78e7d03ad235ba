//! Minimal Claude Messages API client.

use serde::{Deserialize, Serialize};

/// Default API endpoint.
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClaudeConfig {
    /// API key, normally from `ANTHROPIC_API_KEY`.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Maximum tokens to generate per request.
    pub max_tokens: u32,
    /// Base URL, overridable for testing.
    pub base_url: String,
}

impl ClaudeConfig {
    /// Build a config from the process environment.
    pub fn from_env() -> Result<Self, ClientError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| ClientError::MissingApiKey)?;
        Ok(Self {
            api_key,
            model: "claude-sonnet-4-5".to_string(),
            max_tokens: 4096,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }
}

/// Message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End-user turn.
    User,
    /// Model turn.
    Assistant,
}

/// A single conversation message.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Who is speaking.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl Message {
    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// An assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A completed response: concatenated text plus the completion reason.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Concatenated text content blocks.
    pub text: String,
    /// Stop reason as reported by the API; `end_turn` is the only normal
    /// completion.
    pub stop_reason: Option<String>,
}

impl Completion {
    /// Whether the model stopped normally.
    pub fn is_normal(&self) -> bool {
        self.stop_reason.as_deref() == Some("end_turn")
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Claude API client.
pub struct ClaudeClient {
    config: ClaudeConfig,
    http: reqwest::Client,
}

impl ClaudeClient {
    /// Create a client with the given config.
    pub fn new(config: ClaudeConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Ok(Self::new(ClaudeConfig::from_env()?))
    }

    /// The active config.
    pub fn config(&self) -> &ClaudeConfig {
        &self.config
    }

    /// Send one conversation with an optional system prompt and return the
    /// completion.
    pub async fn complete_with_system(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
    ) -> Result<Completion, ClientError> {
        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system: system.as_deref(),
            messages: &messages,
        };

        let response = self
            .http
            .post(format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response.json().await?;
        let text: String = parsed
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect();

        if text.is_empty() {
            return Err(ClientError::EmptyResponse);
        }

        Ok(Completion {
            text,
            stop_reason: parsed.stop_reason,
        })
    }
}

/// Client errors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// `ANTHROPIC_API_KEY` is not set.
    #[error("ANTHROPIC_API_KEY is not set")]
    MissingApiKey,

    /// Transport-level failure.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("API error {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// Response contained no text content.
    #[error("response contained no text content")]
    EmptyResponse,
}
