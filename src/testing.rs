//! Test doubles shared by unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use crate::agent::{Orchestrator, ReplySink, HOST_UI_FILES_TOOL};
use crate::llm::{
    ContentBlock, ContentItem, LlmClient, LlmError, LlmProvider, Message, ModelResponse,
    StopReason, ToolDefinition,
};
use crate::storage::{MockObjectStore, ObjectStore};

/// Sink that records every reply
#[derive(Default)]
pub struct RecordingSink {
    replies: Mutex<Vec<String>>,
}

impl RecordingSink {
    /// Replies received so far, in order
    pub fn replies(&self) -> Vec<String> {
        self.replies.lock().expect("sink lock").clone()
    }
}

#[async_trait]
impl ReplySink for RecordingSink {
    async fn reply(&self, text: &str) -> anyhow::Result<()> {
        self.replies.lock().expect("sink lock").push(text.to_string());
        Ok(())
    }
}

/// Sink whose every delivery fails
pub struct FailingSink;

#[async_trait]
impl ReplySink for FailingSink {
    async fn reply(&self, _text: &str) -> anyhow::Result<()> {
        anyhow::bail!("chat unavailable")
    }
}

/// Provider that plays back canned responses and records each conversation it receives
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<ModelResponse>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlm {
    /// Script the responses for consecutive calls
    pub fn new(responses: Vec<ModelResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Conversations passed to each call
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(
        &self,
        _system_prompt: &str,
        messages: &[Message],
        _tools: &[ToolDefinition],
        _model_id: &str,
        _max_tokens: u32,
    ) -> Result<ModelResponse, LlmError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(messages.to_vec());
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .ok_or_else(|| LlmError::ApiError("script exhausted".to_string()))
    }
}

/// Text block
pub fn text(text: &str) -> ContentBlock {
    ContentBlock::Item(ContentItem::Text {
        text: text.to_string(),
    })
}

/// `host_ui_files` invocation block
pub fn tool_use(id: &str, filename: &str, filecontent: &str) -> ContentBlock {
    ContentBlock::Item(ContentItem::ToolUse {
        id: id.to_string(),
        name: HOST_UI_FILES_TOOL.to_string(),
        input: json!({"filename": filename, "filecontent": filecontent}),
    })
}

/// Model response without usage data
pub fn response(stop_reason: StopReason, content: Vec<ContentBlock>) -> ModelResponse {
    ModelResponse {
        stop_reason,
        content,
        usage: None,
    }
}

/// Store whose every upload returns `ok`
pub fn store_always(ok: bool) -> MockObjectStore {
    let mut store = MockObjectStore::new();
    store.expect_put().returning(move |_, _| ok);
    store
}

/// Orchestrator over a scripted model and the given store
pub fn orchestrator_with(
    llm: &Arc<ScriptedLlm>,
    store: impl ObjectStore + 'static,
    public_base_url: &str,
    max_tool_iterations: usize,
) -> Orchestrator {
    let client = LlmClient::with_provider(llm.clone(), "test-model", 1024, "test prompt");
    Orchestrator::new(
        Arc::new(client),
        Arc::new(store),
        public_base_url,
        max_tool_iterations,
    )
}
