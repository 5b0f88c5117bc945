//! Configuration and settings management
//!
//! Loads settings from config files and environment variables and defines
//! the constants shared by the bot, the LLM client and the storage layer.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// Anthropic API key
    pub anthropic_api_key: Option<String>,
    /// Base URL of the Anthropic API
    #[serde(default = "default_anthropic_api_base")]
    pub anthropic_api_base: String,
    /// Model identifier sent with every request
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,
    /// Maximum output tokens per model call
    #[serde(default = "default_anthropic_max_tokens")]
    pub anthropic_max_tokens: u32,
    /// Overrides the built-in system prompt
    pub system_prompt: Option<String>,
    /// Maximum number of tool-use rounds per incoming message
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,
    /// HTTP timeout for LLM requests; unset means no timeout
    pub llm_http_timeout_secs: Option<u64>,

    /// R2 Storage access key ID
    pub r2_access_key_id: Option<String>,
    /// R2 Storage secret access key
    pub r2_secret_access_key: Option<String>,
    /// R2 Storage endpoint URL
    pub r2_endpoint_url: Option<String>,
    /// R2 Storage bucket name
    #[serde(default = "default_r2_bucket_name")]
    pub r2_bucket_name: String,
    /// Public base URL the hosted files are served from (including trailing slash)
    pub r2_public_url: Option<String>,
}

fn default_anthropic_api_base() -> String {
    DEFAULT_ANTHROPIC_API_BASE.to_string()
}

fn default_anthropic_model() -> String {
    DEFAULT_MODEL_ID.to_string()
}

const fn default_anthropic_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

const fn default_max_tool_iterations() -> usize {
    DEFAULT_MAX_TOOL_ITERATIONS
}

fn default_r2_bucket_name() -> String {
    DEFAULT_BUCKET_NAME.to_string()
}

/// Build the layered configuration source.
///
/// Sources, lowest priority first: `config/default`, `config/{RUN_MODE}`,
/// `config/local`, `APP__*` variables, then plain environment variables.
///
/// # Errors
///
/// Returns a `ConfigError` if any source fails to load.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Local overrides, not checked into git
        .add_source(File::with_name("config/local").required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        // UPPER_SNAKE_CASE variables map onto snake_case fields; empty ones count as unset
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use uihost_bot::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        build_config()?.try_deserialize()
    }

    /// System prompt sent with every model call
    #[must_use]
    pub fn effective_system_prompt(&self) -> &str {
        self.system_prompt
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }
}

/// Default Anthropic API base URL
pub const DEFAULT_ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
/// Value of the `anthropic-version` header
pub const ANTHROPIC_API_VERSION: &str = "2023-06-01";
/// Default model identifier
pub const DEFAULT_MODEL_ID: &str = "claude-3-7-sonnet-20250219";
/// Default maximum output tokens
pub const DEFAULT_MAX_TOKENS: u32 = 20_000;
/// Default system prompt for the frontend generator
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a code generator which helps in generating frontend files and hosting those generated files. Always use index.html as the main html file.";
/// Default cap on tool-use rounds per incoming message
pub const DEFAULT_MAX_TOOL_ITERATIONS: usize = 25;

/// Default bucket for hosted files
pub const DEFAULT_BUCKET_NAME: &str = "experiments";

/// Length of the per-message upload key
pub const UPLOAD_KEY_LEN: usize = 9;
/// Alphabet the upload key is drawn from
pub const UPLOAD_KEY_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

// Telegram API retry configuration
/// Initial backoff for Telegram API retries
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Upper bound for a single Telegram API backoff
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;
/// Retries after the first failed Telegram API attempt
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;
