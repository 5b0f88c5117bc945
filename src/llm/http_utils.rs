//! HTTP utilities for LLM providers
//!
//! Request/response handling shared by HTTP-based provider implementations.

use crate::llm::LlmError;
use crate::utils::truncate_str;
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::time::Duration;

/// Longest error body kept in an `LlmError::ApiError`
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Creates an HTTP client, optionally with a request timeout.
///
/// Without a timeout a stuck request blocks until the server gives up.
#[must_use]
pub fn create_http_client(timeout_secs: Option<u64>) -> HttpClient {
    let mut builder = HttpClient::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build().unwrap_or_else(|_| HttpClient::new())
}

/// Sends an HTTP POST request with JSON body and returns parsed JSON response.
///
/// # Arguments
/// * `client` - HTTP client to use
/// * `url` - Target URL
/// * `body` - JSON body to send
/// * `headers` - Additional headers as key-value pairs
///
/// # Errors
///
/// Returns `LlmError::NetworkError` on connectivity issues, `LlmError::ApiError` on non-success status codes,
/// or `LlmError::JsonError` if parsing fails.
pub async fn send_json_request(
    client: &HttpClient,
    url: &str,
    body: &Value,
    headers: &[(&str, &str)],
) -> Result<Value, LlmError> {
    let mut request = client.post(url).json(body);

    for (key, value) in headers {
        request = request.header(*key, *value);
    }

    let response = request
        .send()
        .await
        .map_err(|e| LlmError::NetworkError(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(LlmError::ApiError(describe_error_body(
            status.as_u16(),
            &error_text,
        )));
    }

    response
        .json()
        .await
        .map_err(|e| LlmError::JsonError(e.to_string()))
}

/// Builds a readable error message from a failed response body.
///
/// HTML error pages from proxies are summarised instead of being included.
fn describe_error_body(status: u16, error_text: &str) -> String {
    let trimmed = error_text.trim_start();
    let is_html = trimmed.starts_with("<!DOCTYPE")
        || trimmed.starts_with("<html")
        || trimmed.starts_with("<HTML");

    if is_html {
        return format!("API error: {status} (Server returned HTML error page)");
    }

    if error_text.chars().count() > MAX_ERROR_BODY_CHARS {
        format!(
            "API error: {status} - {}... (truncated)",
            truncate_str(error_text, MAX_ERROR_BODY_CHARS)
        )
    } else {
        format!("API error: {status} - {error_text}")
    }
}
