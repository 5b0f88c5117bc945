//! Tool-use orchestration module
//!
//! This module turns one incoming user message into a bounded conversation
//! with the model:
//! - Relays the conversation together with the `host_ui_files` tool
//! - Uploads every file the model hands back under a per-message upload key
//! - Feeds upload outcomes back to the model until it finishes
//! - Reports progress through a transport-agnostic reply sink

/// Conversation orchestrator (tool-use loop)
pub mod orchestrator;
/// Reply sink abstraction for transports
pub mod reply;
/// Declaration of the file hosting tool
pub mod tools;
/// Per-message upload key generation
pub mod upload_key;

pub use orchestrator::{Completion, Orchestrator, OrchestratorError};
pub use reply::ReplySink;
pub use tools::{host_ui_files_tool, HostFileArgs, HOST_UI_FILES_TOOL};
pub use upload_key::UploadKey;
