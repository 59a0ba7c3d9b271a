//! Shared HTTP plumbing for the generation and content-store clients.
//!
//! Every client gets a bounded request timeout. There is no retry loop: a
//! failed call fails once and the pipeline applies its per-stage policy.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tracing::warn;

/// Transport settings for one upstream service.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout.
    pub timeout: Duration,
    /// Refuse plain-HTTP endpoints.
    pub https_only: bool,
}

impl HttpConfig {
    pub fn new(timeout: Duration, https_only: bool) -> Self {
        Self {
            timeout,
            https_only,
        }
    }
}

/// Build a reqwest client for the given transport settings.
pub fn build_client(config: &HttpConfig) -> Result<Client, String> {
    let mut builder = Client::builder()
        .timeout(config.timeout)
        .user_agent(concat!("proofart/", env!("CARGO_PKG_VERSION")));

    if config.https_only {
        builder = builder
            .https_only(true)
            .min_tls_version(reqwest::tls::Version::TLS_1_2);
    }

    builder.build().map_err(|e| {
        warn!(error = %e, "Failed to create HTTP client");
        format!("Failed to create HTTP client: {e}")
    })
}

/// Pull a human-readable message out of an unsuccessful response.
///
/// Looks at `message`, `error` (string) and `error.message` in a JSON body and
/// falls back to the raw body or the status line.
pub async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    message_from_body(status, &body)
}

fn message_from_body(status: StatusCode, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let candidate = json
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| json.get("error").and_then(Value::as_str))
            .or_else(|| {
                json.get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(Value::as_str)
            });
        if let Some(msg) = candidate {
            return msg.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {status}")
    } else {
        trimmed.chars().take(200).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_from_json_message_field() {
        let msg = message_from_body(
            StatusCode::BAD_REQUEST,
            r#"{"message":"invalid prompt","name":"bad_request"}"#,
        );
        assert_eq!(msg, "invalid prompt");
    }

    #[test]
    fn test_message_from_nested_error() {
        let msg = message_from_body(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"message":"content policy violation","type":"invalid_request_error"}}"#,
        );
        assert_eq!(msg, "content policy violation");
    }

    #[test]
    fn test_message_from_error_string() {
        let msg = message_from_body(StatusCode::UNAUTHORIZED, r#"{"error":"Invalid JWT"}"#);
        assert_eq!(msg, "Invalid JWT");
    }

    #[test]
    fn test_message_falls_back_to_status() {
        let msg = message_from_body(StatusCode::BAD_GATEWAY, "");
        assert_eq!(msg, "HTTP 502 Bad Gateway");
    }

    #[test]
    fn test_message_falls_back_to_body() {
        let msg = message_from_body(StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded");
        assert_eq!(msg, "upstream exploded");
    }

    #[test]
    fn test_build_client() {
        assert!(build_client(&HttpConfig::new(Duration::from_secs(5), true)).is_ok());
        assert!(build_client(&HttpConfig::new(Duration::from_secs(5), false)).is_ok());
    }
}
