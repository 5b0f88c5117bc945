//! Conversation orchestrator
//!
//! Drives the tool-use loop for one incoming message: call the model, upload
//! every file it asks to host, answer each tool invocation with its outcome,
//! and repeat until the model stops asking for tools.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::reply::ReplySink;
use super::tools::{host_ui_files_tool, HostFileArgs, HOST_UI_FILES_TOOL};
use super::upload_key::UploadKey;
use crate::llm::{
    ContentBlock, ContentItem, LlmClient, LlmError, Message, StopReason, ToolDefinition,
    ToolOutcome,
};
use crate::storage::{hosted_file_key, ObjectStore};

/// Reply sent when the model hits its output size limit
pub const MAX_TOKENS_NOTICE: &str = "Max Tokens limit reached";
/// Reply sent when the tool-use round cap is exceeded
pub const TOOL_LIMIT_NOTICE: &str =
    "Stopped: the model kept requesting uploads beyond the allowed number of rounds.";
/// Reply sent for any other failure while processing a message
pub const GENERIC_FAILURE_NOTICE: &str =
    "Something went wrong while processing your request. Please try again.";

/// How an orchestration finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The model finished its turn
    EndTurn,
    /// The model hit its output size limit
    MaxTokens,
}

/// Errors that end an orchestration early
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The model call failed
    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),
    /// A reply could not be delivered to the user
    #[error("Failed to deliver reply: {0}")]
    Reply(String),
    /// The model kept requesting tools past the configured cap
    #[error("Tool-use limit exceeded after {limit} rounds")]
    ToolUseLimitExceeded {
        /// Configured maximum number of tool-use rounds
        limit: usize,
    },
    /// The model stopped for a reason this bot does not handle
    #[error("Unmapped stop reason: {0}")]
    UnmappedStopReason(String),
}

impl OrchestratorError {
    /// Text to show the user, if they can still be reached
    #[must_use]
    pub const fn user_notice(&self) -> Option<&'static str> {
        match self {
            Self::Reply(_) => None,
            Self::ToolUseLimitExceeded { .. } => Some(TOOL_LIMIT_NOTICE),
            Self::Llm(_) | Self::UnmappedStopReason(_) => Some(GENERIC_FAILURE_NOTICE),
        }
    }
}

/// Mediates between the model, the object store and the user
pub struct Orchestrator {
    llm: Arc<LlmClient>,
    store: Arc<dyn ObjectStore>,
    public_base_url: String,
    max_tool_iterations: usize,
    tools: Vec<ToolDefinition>,
}

impl Orchestrator {
    /// Create an orchestrator over already constructed clients
    #[must_use]
    pub fn new(
        llm: Arc<LlmClient>,
        store: Arc<dyn ObjectStore>,
        public_base_url: impl Into<String>,
        max_tool_iterations: usize,
    ) -> Self {
        Self {
            llm,
            store,
            public_base_url: public_base_url.into(),
            max_tool_iterations,
            tools: vec![host_ui_files_tool()],
        }
    }

    /// Process one incoming message under a freshly generated upload key.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::process_with_key`].
    pub async fn process(
        &self,
        input: &str,
        sink: &dyn ReplySink,
    ) -> Result<Completion, OrchestratorError> {
        self.process_with_key(input, sink, &UploadKey::generate())
            .await
    }

    /// Process one incoming message, uploading files under `upload_key`.
    ///
    /// Every reply goes through `sink`. Upload failures are reported to the
    /// model and the user and do not stop the loop.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::Llm` if a model call fails,
    /// `OrchestratorError::Reply` if the sink fails,
    /// `OrchestratorError::ToolUseLimitExceeded` once the round cap is passed, and
    /// `OrchestratorError::UnmappedStopReason` for stop reasons other than
    /// `end_turn` and `max_tokens`.
    pub async fn process_with_key(
        &self,
        input: &str,
        sink: &dyn ReplySink,
        upload_key: &UploadKey,
    ) -> Result<Completion, OrchestratorError> {
        info!(upload_key = %upload_key, chars = input.chars().count(), "Processing message");

        let mut conversation = vec![Message::user(input)];
        let mut response = self.llm.complete(&conversation, &self.tools).await?;
        let mut rounds = 0usize;

        while response.stop_reason == StopReason::ToolUse {
            rounds += 1;
            if rounds > self.max_tool_iterations {
                warn!(
                    upload_key = %upload_key,
                    limit = self.max_tool_iterations,
                    "Tool-use limit exceeded"
                );
                return Err(OrchestratorError::ToolUseLimitExceeded {
                    limit: self.max_tool_iterations,
                });
            }

            let results = self
                .run_tool_round(&response.content, upload_key, sink)
                .await?;
            debug!(round = rounds, tool_results = results.len(), "Tool round finished");

            conversation.push(Message::assistant_blocks(response.content));
            conversation.extend(results);

            response = self.llm.complete(&conversation, &self.tools).await?;
        }

        match &response.stop_reason {
            StopReason::EndTurn => {
                for item in response.items() {
                    if let ContentItem::Text { text } = item {
                        self.send(sink, text).await?;
                    }
                }
                info!(upload_key = %upload_key, rounds, "Orchestration finished");
                Ok(Completion::EndTurn)
            }
            StopReason::MaxTokens => {
                warn!(upload_key = %upload_key, rounds, "Model hit max tokens");
                self.send(sink, MAX_TOKENS_NOTICE).await?;
                Ok(Completion::MaxTokens)
            }
            // The loop above only exits on a different stop reason
            StopReason::ToolUse => Err(OrchestratorError::UnmappedStopReason(
                StopReason::ToolUse.to_string(),
            )),
            StopReason::Other(reason) => {
                error!(upload_key = %upload_key, stop_reason = %reason, "Unmapped stop reason");
                Err(OrchestratorError::UnmappedStopReason(reason.clone()))
            }
        }
    }

    /// Handle every item of one model response in order.
    ///
    /// Returns one tool result message per tool invocation, in invocation order.
    async fn run_tool_round(
        &self,
        blocks: &[ContentBlock],
        upload_key: &UploadKey,
        sink: &dyn ReplySink,
    ) -> Result<Vec<Message>, OrchestratorError> {
        let mut results = Vec::new();

        for block in blocks {
            match block {
                ContentBlock::Item(ContentItem::Text { text }) => {
                    self.send(sink, text).await?;
                }
                ContentBlock::Item(ContentItem::ToolUse { id, name, input }) => {
                    let outcome = self
                        .handle_tool_use(name, input, upload_key, sink)
                        .await?;
                    results.push(Message::tool_result(id, outcome));
                }
                ContentBlock::Item(ContentItem::ToolResult { .. }) | ContentBlock::Other(_) => {
                    debug!("Ignoring content block without an action");
                }
            }
        }

        Ok(results)
    }

    async fn handle_tool_use(
        &self,
        name: &str,
        input: &serde_json::Value,
        upload_key: &UploadKey,
        sink: &dyn ReplySink,
    ) -> Result<ToolOutcome, OrchestratorError> {
        if name != HOST_UI_FILES_TOOL {
            warn!(tool = name, "Model requested an unknown tool");
            return Ok(ToolOutcome::Failure);
        }

        let args = match HostFileArgs::from_input(input) {
            Ok(args) => args,
            Err(e) => {
                warn!(tool = name, error = %e, "Malformed tool input");
                return Ok(ToolOutcome::Failure);
            }
        };

        self.send(sink, &format!("Uploading ==> {}", args.filename))
            .await?;

        let key = hosted_file_key(upload_key.as_str(), &args.filename);
        let url = format!("{}{}", self.public_base_url, key);

        if self.store.put(&key, args.filecontent.as_bytes()).await {
            info!(key = %key, bytes = args.filecontent.len(), "File hosted");
            self.send(sink, &format!("uploaded: {url}")).await?;
            Ok(ToolOutcome::Success)
        } else {
            error!(key = %key, "Failed uploading file");
            self.send(sink, &format!("failed uploading: {url}")).await?;
            Ok(ToolOutcome::Failure)
        }
    }

    async fn send(&self, sink: &dyn ReplySink, text: &str) -> Result<(), OrchestratorError> {
        sink.reply(text)
            .await
            .map_err(|e| OrchestratorError::Reply(format!("{e:#}")))
    }
}
