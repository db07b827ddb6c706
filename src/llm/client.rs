//! LLM Client abstractions and provider management
//!
//! This module provides a unified interface for the language-model backends
//! the research pipeline talks to:
//! - **OpenAI**: any `/chat/completions` compatible endpoint, with tool calling
//! - **Ollama**: local inference through `/api/chat`, with tool calling
//!
//! Both providers speak plain JSON over `reqwest`, so adding another
//! OpenAI-compatible gateway is a matter of pointing `base_url` at it.

use crate::types::{AppError, Result, ToolCall, ToolDefinition};
use crate::utils::toml_config::{LlmConfig, ProviderKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Generic LLM client trait for provider abstraction
///
/// All LLM providers implement this trait, allowing for easy swapping
/// between providers without changing application code.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate with system prompt
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Generate a response constrained to a JSON schema.
    ///
    /// Providers switch on their native JSON mode; callers still validate the
    /// returned text, since not every model honours the schema.
    async fn generate_json(
        &self,
        system: &str,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> Result<String>;

    /// Generate one turn of a tool-calling conversation
    async fn generate_with_tools_and_history(
        &self,
        messages: &[ConversationMessage],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Response from an LLM generation request
#[derive(Debug, Clone)]
pub struct LLMResponse {
    /// The text content of the response
    pub content: String,
    /// Any tool calls requested by the model
    pub tool_calls: Vec<ToolCall>,
    /// The reason generation stopped (e.g., "stop", "tool_calls", "length")
    pub finish_reason: String,
}

/// A message in a tool-calling conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// The role of the message sender.
    pub role: MessageRole,
    /// The text content of the message.
    pub content: String,
    /// Tool calls requested by the assistant (only for Assistant role).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Tool call this message answers (only for Tool role).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// Role of a message sender in a tool-calling conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        }
    }
}

impl ConversationMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create an assistant message with optional tool calls.
    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
        }
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, result: &serde_json::Value) -> Self {
        Self {
            role: MessageRole::Tool,
            content: serde_json::to_string(result).unwrap_or_else(|_| "{}".to_string()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// Sampling and transport parameters shared by every provider
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    pub temperature: f32,
    pub request_timeout: Duration,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Provider enum for runtime selection
#[derive(Debug, Clone)]
pub enum Provider {
    /// OpenAI API provider (including Azure OpenAI and compatible APIs)
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::OpenAI {
    ///     api_key: "sk-...".to_string(),
    ///     api_base: "https://api.openai.com/v1".to_string(),
    ///     model: "gpt-4o-mini".to_string(),
    ///     params: ModelParams::default(),
    /// };
    /// ```
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
        params: ModelParams,
    },

    /// Ollama local LLM provider
    ///
    /// Tool calling requires a model that supports it (e.g. `llama3.1`,
    /// `qwen2.5`). For models without it, set `research.search_mode = "prefetch"`.
    Ollama {
        base_url: String,
        model: String,
        params: ModelParams,
    },
}

impl Provider {
    /// Build a provider from the `[llm]` config section.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the OpenAI key variable is unset.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let params = ModelParams {
            temperature: config.temperature,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        };

        match config.provider {
            ProviderKind::Ollama => Ok(Provider::Ollama {
                base_url: config.base_url.clone(),
                model: config.model.clone(),
                params,
            }),
            ProviderKind::OpenAI => {
                let api_key = config.resolve_api_key().ok_or_else(|| {
                    AppError::Configuration(format!(
                        "Environment variable '{}' is not set",
                        config.api_key_env.as_deref().unwrap_or("OPENAI_API_KEY")
                    ))
                })?;

                Ok(Provider::OpenAI {
                    api_key,
                    api_base: config.base_url.clone(),
                    model: config.model.clone(),
                    params,
                })
            }
        }
    }

    /// Create a client instance for this provider
    pub fn create_client(&self) -> Result<Arc<dyn LLMClient>> {
        match self {
            Provider::OpenAI {
                api_key,
                api_base,
                model,
                params,
            } => Ok(Arc::new(super::openai::OpenAIClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
                params.clone(),
            )?)),

            Provider::Ollama {
                base_url,
                model,
                params,
            } => Ok(Arc::new(super::ollama::OllamaClient::new(
                base_url.clone(),
                model.clone(),
                params.clone(),
            )?)),
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI { .. } => "OpenAI",
            Provider::Ollama { .. } => "Ollama",
        }
    }

    /// The model identifier this provider will request
    pub fn model(&self) -> &str {
        match self {
            Provider::OpenAI { model, .. } | Provider::Ollama { model, .. } => model,
        }
    }
}

pub(crate) fn http_client(params: &ModelParams) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(params.request_timeout)
        .build()
        .map_err(|e| AppError::LLM(format!("Failed to build HTTP client: {}", e)))
}
