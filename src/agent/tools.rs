//! The `host_ui_files` tool offered to the model.

use crate::llm::ToolDefinition;
use serde::Deserialize;
use serde_json::{json, Value};

/// Name of the file hosting tool
pub const HOST_UI_FILES_TOOL: &str = "host_ui_files";

/// Arguments for the `host_ui_files` tool
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct HostFileArgs {
    /// Name of the file to host, e.g. `index.html`
    pub filename: String,
    /// File content to host
    pub filecontent: String,
}

impl HostFileArgs {
    /// Parse tool arguments from the raw JSON input of a tool invocation
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is missing or not a string.
    pub fn from_input(input: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(input)
    }
}

/// Declaration of the `host_ui_files` tool
#[must_use]
pub fn host_ui_files_tool() -> ToolDefinition {
    ToolDefinition {
        name: HOST_UI_FILES_TOOL.to_string(),
        description: "Host the ui files in the cloud".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "filename": {
                    "type": "string",
                    "description": "The name of the file to be hosted, e.g. index.html, styles.css, script.js"
                },
                "filecontent": {
                    "type": "string",
                    "description": "The content of the file to be hosted"
                }
            },
            "required": ["filename", "filecontent"]
        }),
    }
}
