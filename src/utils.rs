//! Text helpers and the Telegram retry wrapper.

use anyhow::Result;
use std::time::Duration;
use teloxide::RequestError;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::warn;
use unicode_segmentation::UnicodeSegmentation;

/// Split a message into parts of at most `max_chars` characters.
///
/// Lines are packed greedily and kept whole when possible. A single line
/// longer than the limit is cut on grapheme boundaries, so no part ever
/// splits a user-perceived character. Whitespace-only parts are dropped.
///
/// # Examples
///
/// ```
/// use uihost_bot::utils::split_long_message;
/// assert_eq!(split_long_message("short", 10), vec!["short"]);
/// assert!(split_long_message("", 10).is_empty());
/// ```
#[must_use]
pub fn split_long_message(message: &str, max_chars: usize) -> Vec<String> {
    if message.trim().is_empty() || max_chars == 0 {
        return Vec::new();
    }
    if message.chars().count() <= max_chars {
        return vec![message.to_string()];
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for line in message.lines() {
        let line_len = line.chars().count();

        if line_len > max_chars {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
                current_len = 0;
            }
            for grapheme in line.graphemes(true) {
                let g_len = grapheme.chars().count();
                if current_len + g_len > max_chars && !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                current.push_str(grapheme);
                current_len += g_len;
            }
            continue;
        }

        let separator = usize::from(!current.is_empty());
        if current_len + separator + line_len > max_chars {
            parts.push(std::mem::take(&mut current));
            current_len = 0;
        } else if separator == 1 {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        parts.push(current);
    }
    parts.retain(|part| !part.trim().is_empty());
    parts
}

/// Truncate a string to at most `max_chars` characters.
///
/// # Examples
///
/// ```
/// use uihost_bot::utils::truncate_str;
/// let s = "Привет, мир!";
/// assert_eq!(truncate_str(s, 6), "Привет");
/// ```
pub fn truncate_str(s: impl AsRef<str>, max_chars: usize) -> String {
    let s = s.as_ref();
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.char_indices()
        .nth(max_chars)
        .map_or_else(|| s.to_string(), |(pos, _)| s[..pos].to_string())
}

/// Returns true for Telegram errors worth another attempt: flood control
/// and network failures. Anything else is returned to the caller at once.
#[must_use]
pub fn is_transient_telegram_error(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<RequestError>(),
        Some(RequestError::RetryAfter(_) | RequestError::Network(_))
    )
}

/// Retry a Telegram API operation with exponential backoff and jitter.
///
/// Only errors accepted by [`is_transient_telegram_error`] are retried.
/// Delays start at `TELEGRAM_API_INITIAL_BACKOFF_MS`, are capped at
/// `TELEGRAM_API_MAX_BACKOFF_MS` and at most `TELEGRAM_API_MAX_RETRIES`
/// retries are made.
///
/// # Errors
///
/// Returns the first permanent error, or the last error if every attempt fails.
pub async fn retry_telegram_operation<F, Fut, T>(operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    use crate::config::{
        TELEGRAM_API_INITIAL_BACKOFF_MS, TELEGRAM_API_MAX_BACKOFF_MS, TELEGRAM_API_MAX_RETRIES,
    };

    let retry_strategy = ExponentialBackoff::from_millis(TELEGRAM_API_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
        .map(jitter)
        .take(TELEGRAM_API_MAX_RETRIES);

    RetryIf::spawn(retry_strategy, operation, is_transient_telegram_error)
        .await
        .map_err(|e| {
            warn!("Telegram API operation failed: {}", e);
            e
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use teloxide::types::Seconds;
    use teloxide::ApiError;

    #[test]
    fn test_truncate_str_unicode() {
        let s = "Привет, мир!";
        assert_eq!(truncate_str(s, 6), "Привет");
        assert_eq!(truncate_str(s, 50), "Привет, мир!");
    }

    #[test]
    fn test_split_keeps_lines_whole() {
        let message = "aaaa\nbbbb\ncccc";
        assert_eq!(split_long_message(message, 9), vec!["aaaa\nbbbb", "cccc"]);
    }

    #[test]
    fn test_split_cuts_overlong_line() {
        let message = "x".repeat(25);
        let parts = split_long_message(&message, 10);
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| p.chars().count() <= 10));
        assert_eq!(parts.concat(), message);
    }

    #[test]
    fn test_split_drops_blank_parts() {
        let message = "aaaaaaaa\n        \nbbbbbbbb";
        assert_eq!(split_long_message(message, 8), vec!["aaaaaaaa", "bbbbbbbb"]);
        assert!(split_long_message(" \n\t ", 10).is_empty());
    }

    #[test]
    fn test_split_respects_graphemes() {
        let message = "é".repeat(12);
        let parts = split_long_message(&message, 5);
        assert!(parts.iter().all(|p| p.chars().count() <= 5));
        assert_eq!(parts.concat(), message);
    }

    fn flood_control() -> anyhow::Error {
        RequestError::RetryAfter(Seconds::from_seconds(1)).into()
    }

    #[test]
    fn test_transient_error_classification() {
        assert!(is_transient_telegram_error(&flood_control()));
        assert!(!is_transient_telegram_error(
            &RequestError::Api(ApiError::MessageToReplyNotFound).into()
        ));
        assert!(!is_transient_telegram_error(&anyhow::anyhow!("not a request error")));
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_failure() {
        let attempts = AtomicUsize::new(0);
        let result = retry_telegram_operation(|| {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    return Err(flood_control());
                }
                Ok(attempt)
            }
        })
        .await;

        assert_eq!(result.expect("second attempt succeeds"), 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let attempts = AtomicUsize::new(0);
        let result: Result<()> = retry_telegram_operation(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(RequestError::Api(ApiError::MessageToReplyNotFound).into()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
