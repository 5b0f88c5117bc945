use crate::config::ANTHROPIC_API_VERSION;
use crate::llm::http_utils::{create_http_client, send_json_request};
use crate::llm::{LlmError, LlmProvider, Message, ModelResponse, ToolDefinition};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::{json, Value};

/// LLM provider implementation for the Anthropic Messages API
pub struct AnthropicProvider {
    http_client: HttpClient,
    api_key: String,
    api_base: String,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider instance
    #[must_use]
    pub fn new(api_key: String, api_base: String, timeout_secs: Option<u64>) -> Self {
        Self {
            http_client: create_http_client(timeout_secs),
            api_key,
            api_base,
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/messages", self.api_base.trim_end_matches('/'))
    }
}

fn build_request_body(
    system_prompt: &str,
    messages: &[Message],
    tools: &[ToolDefinition],
    model_id: &str,
    max_tokens: u32,
) -> Value {
    json!({
        "model": model_id,
        "max_tokens": max_tokens,
        "system": system_prompt,
        "tools": tools,
        "messages": messages,
    })
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        model_id: &str,
        max_tokens: u32,
    ) -> Result<ModelResponse, LlmError> {
        let body = build_request_body(system_prompt, messages, tools, model_id, max_tokens);
        let headers = [
            ("x-api-key", self.api_key.as_str()),
            ("anthropic-version", ANTHROPIC_API_VERSION),
        ];

        let res_json =
            send_json_request(&self.http_client, &self.messages_url(), &body, &headers).await?;

        serde_json::from_value(res_json).map_err(|e| LlmError::JsonError(e.to_string()))
    }
}
