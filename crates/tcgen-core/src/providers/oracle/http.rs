//! HTTP layer shared by the remote backends: client construction and status mapping.
//!
//! This is the only place that interprets status codes; backends only build request
//! bodies and read response bodies.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER, USER_AGENT};
use tracing::debug;

use crate::errors::{ConfigError, OracleError};

const USER_AGENT_VALUE: &str = concat!("tcgen/", env!("CARGO_PKG_VERSION"));

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, ConfigError> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

    reqwest::Client::builder()
        .timeout(timeout)
        .default_headers(default_headers)
        .build()
        .map_err(|e| ConfigError::InvalidValue {
            field: "http_client".to_string(),
            message: format!("failed to create HTTP client: {}", e),
        })
}

/// Send a JSON request and return the decoded JSON body of a 2xx response.
pub(crate) async fn send_json(
    request: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<serde_json::Value, OracleError> {
    let response = request
        .send()
        .await
        .map_err(|e| map_transport_error(e, timeout))?;
    let status = response.status();
    debug!(status = status.as_u16(), "oracle response received");

    if status.is_success() {
        return response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| map_transport_error(e, timeout));
    }

    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = response.text().await.unwrap_or_default();
    Err(map_status(status.as_u16(), retry_after, body))
}

pub(crate) fn map_status(status: u16, retry_after: Option<Duration>, body: String) -> OracleError {
    let message = error_message(&body);
    match status {
        401 | 403 => OracleError::Unauthorized { message },
        429 => OracleError::RateLimited { retry_after },
        500..=599 => OracleError::Server { status, message },
        _ => OracleError::Api { status, message },
    }
}

fn map_transport_error(err: reqwest::Error, timeout: Duration) -> OracleError {
    if err.is_timeout() {
        OracleError::Timeout { after: timeout }
    } else if err.is_decode() {
        OracleError::InvalidResponse {
            message: err.to_string(),
        }
    } else {
        OracleError::Network {
            message: err.to_string(),
        }
    }
}

/// Both providers wrap errors as `{"error": {"message": ...}}`; fall back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.chars().take(500).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(
            map_status(401, None, String::new()),
            OracleError::Unauthorized { .. }
        ));
        assert!(matches!(
            map_status(429, Some(Duration::from_secs(3)), String::new()),
            OracleError::RateLimited {
                retry_after: Some(d)
            } if d == Duration::from_secs(3)
        ));
        assert!(matches!(
            map_status(502, None, String::new()),
            OracleError::Server { status: 502, .. }
        ));
        assert!(matches!(
            map_status(400, None, String::new()),
            OracleError::Api { status: 400, .. }
        ));
    }

    #[test]
    fn provider_error_message_is_extracted() {
        let err = map_status(
            400,
            None,
            r#"{"error": {"message": "API key not valid", "code": 400}}"#.to_string(),
        );
        assert_eq!(err.to_string(), "API error (status 400): API key not valid");
    }
}
