//! LLM provider and client
//!
//! Wire types for a tool-enabled conversation and a client bound to one
//! provider, model and system prompt.

mod http_utils;
/// Implementations of specific LLM providers
pub mod providers;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, trace, warn};

use crate::config::Settings;

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    /// Error returned by the provider's API
    #[error("API error: {0}")]
    ApiError(String),
    /// Error during network communication
    #[error("Network error: {0}")]
    NetworkError(String),
    /// Error during JSON serialization or deserialization
    #[error("JSON error: {0}")]
    JsonError(String),
    /// Missing provider configuration or API key
    #[error("Missing client/API key: {0}")]
    MissingConfig(String),
    /// The request was rejected before reaching the provider
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Role of a conversation participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human side, including tool results
    User,
    /// The model
    Assistant,
}

/// Outcome reported back to the model for a tool invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolOutcome {
    /// The side effect succeeded
    Success,
    /// The side effect failed
    Failure,
}

/// A content item the orchestrator understands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    /// Plain text segment
    Text {
        /// Text content
        text: String,
    },
    /// Request from the model to invoke a tool
    ToolUse {
        /// Opaque request identifier
        id: String,
        /// Tool name
        name: String,
        /// Tool arguments, kept as raw JSON so they replay verbatim
        input: Value,
    },
    /// Answer to a prior `ToolUse`
    ToolResult {
        /// Identifier of the `ToolUse` being answered
        tool_use_id: String,
        /// Outcome of the invocation
        content: ToolOutcome,
    },
}

/// A content block as it appears on the wire.
///
/// Blocks of unknown kinds are kept as raw JSON so that an assistant turn can
/// be replayed to the model unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentBlock {
    /// A recognised item
    Item(ContentItem),
    /// Any other block kind
    Other(Value),
}

impl From<ContentItem> for ContentBlock {
    fn from(item: ContentItem) -> Self {
        Self::Item(item)
    }
}

/// Message body: raw text or an ordered sequence of blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Raw text
    Text(String),
    /// Ordered content blocks
    Blocks(Vec<ContentBlock>),
}

/// A message in an LLM conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Message body
    pub content: MessageContent,
}

impl Message {
    /// Create a new user message with raw text
    #[must_use]
    pub fn user(content: &str) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(content.to_string()),
        }
    }

    /// Create an assistant message replaying the model's content blocks
    #[must_use]
    pub const fn assistant_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Blocks(blocks),
        }
    }

    /// Create a user message answering one tool invocation
    #[must_use]
    pub fn tool_result(tool_use_id: &str, outcome: ToolOutcome) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Blocks(vec![ContentBlock::Item(ContentItem::ToolResult {
                tool_use_id: tool_use_id.to_string(),
                content: outcome,
            })]),
        }
    }
}

/// Why the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StopReason {
    /// The model requests tool invocations
    ToolUse,
    /// Natural completion
    EndTurn,
    /// Output size limit hit
    MaxTokens,
    /// Any value this client does not map
    Other(String),
}

impl From<String> for StopReason {
    fn from(value: String) -> Self {
        match value.as_str() {
            "tool_use" => Self::ToolUse,
            "end_turn" => Self::EndTurn,
            "max_tokens" => Self::MaxTokens,
            _ => Self::Other(value),
        }
    }
}

impl From<StopReason> for String {
    fn from(value: StopReason) -> Self {
        value.as_str().to_string()
    }
}

impl StopReason {
    /// Wire representation
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ToolUse => "tool_use",
            Self::EndTurn => "end_turn",
            Self::MaxTokens => "max_tokens",
            Self::Other(value) => value,
        }
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token usage statistics from API response
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TokenUsage {
    /// Input tokens (system prompt + conversation + tools)
    #[serde(default)]
    pub input_tokens: u32,
    /// Output tokens
    #[serde(default)]
    pub output_tokens: u32,
}

/// Model response for one call
#[derive(Debug, Clone, Deserialize)]
pub struct ModelResponse {
    /// Reason why the model stopped generating
    pub stop_reason: StopReason,
    /// Ordered content blocks
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    /// Token usage statistics (if provided by the API)
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

impl ModelResponse {
    /// Iterate over the recognised items of this response
    pub fn items(&self) -> impl Iterator<Item = &ContentItem> {
        self.content.iter().filter_map(|block| match block {
            ContentBlock::Item(item) => Some(item),
            ContentBlock::Other(_) => None,
        })
    }
}

/// Tool definition for LLM tool calling
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    /// Name of the tool
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// JSON schema for tool parameters
    #[serde(rename = "input_schema")]
    pub parameters: Value,
}

/// Interface for LLM providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send the conversation and tool declarations, returning one model response
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        model_id: &str,
        max_tokens: u32,
    ) -> Result<ModelResponse, LlmError>;
}

/// Client bound to one provider, model and system prompt
pub struct LlmClient {
    provider: Arc<dyn LlmProvider>,
    /// Model identifier sent with every request
    pub model_id: String,
    /// Maximum output tokens per request
    pub max_tokens: u32,
    /// Fixed system prompt
    pub system_prompt: String,
}

impl LlmClient {
    /// Create a client for the Anthropic provider configured in settings
    ///
    /// # Errors
    ///
    /// Returns `LlmError::MissingConfig` if the API key is not set.
    pub fn new(settings: &Settings) -> Result<Self, LlmError> {
        let api_key = settings
            .anthropic_api_key
            .clone()
            .ok_or_else(|| LlmError::MissingConfig("ANTHROPIC_API_KEY is missing".into()))?;
        let provider = providers::AnthropicProvider::new(
            api_key,
            settings.anthropic_api_base.clone(),
            settings.llm_http_timeout_secs,
        );

        Ok(Self::with_provider(
            Arc::new(provider),
            &settings.anthropic_model,
            settings.anthropic_max_tokens,
            settings.effective_system_prompt(),
        ))
    }

    /// Create a client around an already constructed provider
    #[must_use]
    pub fn with_provider(
        provider: Arc<dyn LlmProvider>,
        model_id: &str,
        max_tokens: u32,
        system_prompt: &str,
    ) -> Self {
        Self {
            provider,
            model_id: model_id.to_string(),
            max_tokens,
            system_prompt: system_prompt.to_string(),
        }
    }

    /// Send the conversation with the given tools to the model.
    ///
    /// Single attempt: errors are returned to the caller as-is.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::InvalidRequest` if `conversation` is empty, or any error from the provider.
    #[instrument(skip(self, conversation, tools), fields(model = %self.model_id))]
    pub async fn complete(
        &self,
        conversation: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ModelResponse, LlmError> {
        if conversation.is_empty() {
            return Err(LlmError::InvalidRequest(
                "conversation must contain at least one message".to_string(),
            ));
        }

        debug!(
            tools_count = tools.len(),
            messages_count = conversation.len(),
            "Sending tool-enabled request to LLM"
        );
        trace!(conversation = ?conversation, "Full LLM Request");

        let start = std::time::Instant::now();
        let result = self
            .provider
            .complete(
                &self.system_prompt,
                conversation,
                tools,
                &self.model_id,
                self.max_tokens,
            )
            .await;
        let duration = start.elapsed();

        match &result {
            Ok(resp) => {
                let usage = resp.usage.clone().unwrap_or_default();
                debug!(
                    duration_ms = duration.as_millis(),
                    stop_reason = %resp.stop_reason,
                    blocks = resp.content.len(),
                    input_tokens = usage.input_tokens,
                    output_tokens = usage.output_tokens,
                    "Received response from LLM"
                );
                trace!(response = ?resp, "Full LLM Response");
            }
            Err(e) => {
                warn!(
                    duration_ms = duration.as_millis(),
                    error = %e,
                    "Received error response from LLM"
                );
            }
        }

        result
    }
}
