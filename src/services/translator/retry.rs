use rand::{thread_rng, Rng};
use reqwest::blocking::{RequestBuilder, Response};
use reqwest::StatusCode;
use std::{thread, time::Duration};

use crate::error::{CoreError, Result};

pub const MAX_RETRIES: usize = 3;
const BASE_DELAY_MS: u64 = 800;

pub fn backoff(attempt: usize) -> Duration {
    let jitter: u64 = thread_rng().gen_range(0..200);
    let ms = BASE_DELAY_MS * (2_u64.pow(attempt as u32)) + jitter;
    Duration::from_millis(ms)
}

pub fn should_retry_http(status: StatusCode) -> bool {
    // 408/429/5xx are usually transient
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

pub fn extract_error_message(body_text: &str) -> String {
    // { "error": { "message": "..." } } or { "message": "..." }
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body_text) {
        if let Some(msg) = v
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return msg.to_string();
        }
        if let Some(msg) = v.get("message").and_then(|m| m.as_str()) {
            return msg.to_string();
        }
    }

    let trimmed = body_text.trim();
    match trimmed.char_indices().nth(400) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// Sends the request built by `build` until it returns a 2xx body or the retry
/// budget runs out. Non-retryable HTTP errors stop immediately.
pub fn send_with_retry(mut build: impl FnMut() -> RequestBuilder) -> Result<String> {
    let mut last_err: Option<CoreError> = None;

    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            thread::sleep(backoff(attempt - 1));
        }

        let resp: Response = match build().send() {
            Ok(resp) => resp,
            Err(err) => {
                tracing::debug!(attempt, error = %err, "translation request failed");
                last_err = Some(err.into());
                continue;
            }
        };

        let status = resp.status();
        // Read as text first so an error body is not lost when it is not JSON.
        let text = match resp.text() {
            Ok(t) => t,
            Err(err) => {
                last_err = Some(err.into());
                continue;
            }
        };

        if status.is_success() {
            return Ok(text);
        }

        let err = CoreError::Api {
            status: status.as_u16(),
            message: extract_error_message(&text),
        };
        tracing::debug!(attempt, error = %err, "translation API refused request");
        if !should_retry_http(status) {
            return Err(err);
        }
        last_err = Some(err);
    }

    Err(last_err.unwrap_or(CoreError::Api {
        status: 0,
        message: "no attempt made".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_classification() {
        assert!(should_retry_http(StatusCode::TOO_MANY_REQUESTS));
        assert!(should_retry_http(StatusCode::BAD_GATEWAY));
        assert!(!should_retry_http(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn error_message_extraction() {
        assert_eq!(extract_error_message(r#"{"error":{"message":"bad key"}}"#), "bad key");
        assert_eq!(extract_error_message(r#"{"message":"slow down"}"#), "slow down");
        let long = "x".repeat(1000);
        assert_eq!(extract_error_message(&long).len(), 403);
    }

    #[test]
    fn backoff_grows() {
        assert!(backoff(2) > backoff(0));
    }
}
