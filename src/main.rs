use dotenvy::dotenv;
use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};
use uihost_bot::bot::run_bot;
use uihost_bot::config::Settings;

/// Default log filter when `RUST_LOG` is not set
const DEFAULT_LOG_FILTER: &str = "uihost_bot=info,hyper=warn,reqwest=warn,aws_config=warn";
/// Log filter used when `DEBUG_MODE` is enabled
const DEBUG_LOG_FILTER: &str = "uihost_bot=debug,hyper=warn,reqwest=warn,aws_config=warn";

/// Regex patterns for redacting sensitive data
struct RedactionPatterns {
    token1: Regex,
    token2: Regex,
    token3: Regex,
    anthropic: Regex,
    r2_1: Regex,
    r2_2: Regex,
    r2_3: Regex,
    r2_4: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            token1: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            token2: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            token3: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
            anthropic: Regex::new(r"sk-ant-[A-Za-z0-9_-]+")?,
            r2_1: Regex::new(r"R2_ACCESS_KEY_ID=[^\s&]+")?,
            r2_2: Regex::new(r"R2_SECRET_ACCESS_KEY=[^\s&]+")?,
            // Debug output of aws-sdk `Credentials`
            r2_3: Regex::new(r#"access_key_id: "[^"]*""#)?,
            r2_4: Regex::new(r#"secret_access_key: "[^"]*""#)?,
        })
    }

    fn redact(&self, input: &str) -> String {
        let mut output = input.to_string();
        output = self
            .token1
            .replace_all(&output, "$1[TELEGRAM_TOKEN]$3")
            .to_string();
        output = self
            .token2
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .token3
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .anthropic
            .replace_all(&output, "[ANTHROPIC_API_KEY]")
            .to_string();
        output = self
            .r2_1
            .replace_all(&output, "R2_ACCESS_KEY_ID=[MASKED]")
            .to_string();
        output = self
            .r2_2
            .replace_all(&output, "R2_SECRET_ACCESS_KEY=[MASKED]")
            .to_string();
        output = self
            .r2_3
            .replace_all(&output, r#"access_key_id: "[MASKED]""#)
            .to_string();
        output = self
            .r2_4
            .replace_all(&output, r#"secret_access_key: "[MASKED]""#)
            .to_string();
        output
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // Report the original length; the redacted text may differ in size.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    // Patterns must exist before the first log line
    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);

    init_logging(patterns);

    info!("Starting UI Host bot...");

    let settings = init_settings();

    run_bot(settings).await;

    Ok(())
}

fn debug_mode_enabled() -> bool {
    std::env::var("DEBUG_MODE")
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);
    let default_filter = if debug_mode_enabled() {
        DEBUG_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> Arc<Settings> {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_secrets() {
        let patterns = RedactionPatterns::new().expect("patterns compile");
        let line = "POST https://api.telegram.org/bot123456789:AAH-abcdefghijklmnopqrstuvwxyz012345/sendMessage key=sk-ant-api03-AbC_dEf";
        let redacted = patterns.redact(line);

        assert!(!redacted.contains("AAH-abcdefghijklmnopqrstuvwxyz012345"));
        assert!(!redacted.contains("sk-ant-api03"));
        assert!(redacted.contains("[ANTHROPIC_API_KEY]"));
    }

    #[test]
    fn test_redacts_r2_credentials() {
        let patterns = RedactionPatterns::new().expect("patterns compile");
        let redacted = patterns.redact("R2_SECRET_ACCESS_KEY=supersecret R2_ACCESS_KEY_ID=abc");
        assert_eq!(
            redacted,
            "R2_SECRET_ACCESS_KEY=[MASKED] R2_ACCESS_KEY_ID=[MASKED]"
        );
    }

    #[test]
    fn test_redacts_sdk_credentials_debug() {
        let patterns = RedactionPatterns::new().expect("patterns compile");
        let line = r#"Credentials { provider_name: "r2-storage", access_key_id: "0123abcd", secret_access_key: "topsecret", expires_after: None }"#;
        let redacted = patterns.redact(line);

        assert!(!redacted.contains("0123abcd"));
        assert!(!redacted.contains("topsecret"));
        assert!(redacted.contains(r#"access_key_id: "[MASKED]""#));
    }
}
