//! Error types for the Car2DB API client.
//!
//! Every non-2xx response is normalised into an [`ApiError`] carrying the
//! status, the status text, an optional detail extracted from the response
//! body and a static hint for the user. Transport-level failures are kept as
//! separate [`FetchError`] variants so the retry loop can tell transient
//! failures from terminal ones.
//!
//! # Security Note
//!
//! None of these errors include request headers, so the API key can never
//! leak through an error message.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Result type for API operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Status text used when the response carries no reason phrase.
const UNKNOWN_STATUS_TEXT: &str = "Unknown Error";

/// A normalised error for a non-2xx API response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    /// Status line text (or "Unknown Error").
    pub error: String,
    /// Numeric HTTP status.
    pub status: u16,
    /// Human message extracted from the response body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Static guidance keyed by status code.
    pub hint: String,
}

impl ApiError {
    /// Builds a normalised error from a status code and the raw response body.
    ///
    /// The body is decoded as JSON on a best-effort basis; if that fails the
    /// error still carries the status text.
    #[must_use]
    pub fn from_response_parts(status: u16, status_text: Option<&str>, body: &[u8]) -> Self {
        let error = status_text
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .unwrap_or(UNKNOWN_STATUS_TEXT)
            .to_string();

        Self {
            error,
            status,
            details: extract_details(body),
            hint: hint_for_status(status).to_string(),
        }
    }

    /// Returns `true` for 5xx statuses, which are worth retrying.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {} {}", self.status, self.error)?;
        if let Some(ref details) = self.details {
            write!(f, ": {details}")?;
        }
        write!(f, " ({})", self.hint)
    }
}

impl std::error::Error for ApiError {}

/// Errors that can occur while fetching from the API.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The API answered with a non-2xx status.
    #[error("{0}")]
    Http(ApiError),

    /// A single attempt exceeded the configured timeout.
    #[error("request timed out after {}ms", timeout.as_millis())]
    Timeout {
        /// The per-attempt timeout that elapsed.
        timeout: Duration,
    },

    /// The request could not be sent or the body could not be read.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// A successful response did not contain valid JSON.
    #[error("failed to parse API response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The request path is not a server-relative path.
    #[error("invalid request path '{path}': must start with '/'")]
    InvalidPath {
        /// The rejected path.
        path: String,
    },

    /// A header value could not be encoded.
    #[error("invalid value for header {name}")]
    InvalidHeader {
        /// Header name (the value is deliberately omitted).
        name: &'static str,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl FetchError {
    /// Returns `true` if the failure is transient: a 5xx response or a timeout.
    ///
    /// 4xx responses, decode failures and other network errors are terminal.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Http(err) => err.is_server_error(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Returns the normalised API error, if this is an HTTP failure.
    #[must_use]
    pub const fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ApiError> for FetchError {
    fn from(err: ApiError) -> Self {
        Self::Http(err)
    }
}

/// Returns the user-facing hint for an HTTP status code.
#[must_use]
pub const fn hint_for_status(status: u16) -> &'static str {
    match status {
        400 => "Check parameter values and types",
        401 => "Invalid API key. Get one at https://car2db.com/api/",
        403 => "Access denied. Check your API key permissions and Referer header",
        404 => "Resource not found. Verify the ID using search or list tools",
        429 => "Rate limit exceeded. Wait before retrying",
        500 | 502 | 503 | 504 => "Server error. Try again in a moment",
        _ => "Unexpected error occurred",
    }
}

/// Extracts a human message from an error body.
///
/// Looks at `message`, then `detail`, then `error`, taking the first field
/// with a non-empty value.
fn extract_details(body: &[u8]) -> Option<String> {
    let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(body) else {
        return None;
    };

    ["message", "detail", "error"]
        .iter()
        .filter_map(|key| map.get(*key))
        .find_map(value_as_message)
}

fn value_as_message(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hints_by_status() {
        assert!(hint_for_status(400).contains("parameter"));
        assert!(hint_for_status(401).contains("https://car2db.com/api/"));
        assert!(hint_for_status(403).contains("Referer"));
        assert!(hint_for_status(404).contains("search or list tools"));
        assert!(hint_for_status(429).contains("Rate limit"));
        for status in [500, 502, 503, 504] {
            assert_eq!(hint_for_status(status), "Server error. Try again in a moment");
        }
        assert_eq!(hint_for_status(418), "Unexpected error occurred");
        assert_eq!(hint_for_status(501), "Unexpected error occurred");
    }

    #[test]
    fn details_priority() {
        let body = br#"{"error": "e", "detail": "d", "message": "m"}"#;
        let err = ApiError::from_response_parts(400, Some("Bad Request"), body);
        assert_eq!(err.details.as_deref(), Some("m"));

        let body = br#"{"error": "e", "detail": "d"}"#;
        let err = ApiError::from_response_parts(400, Some("Bad Request"), body);
        assert_eq!(err.details.as_deref(), Some("d"));

        let body = br#"{"message": "", "error": "e"}"#;
        let err = ApiError::from_response_parts(400, Some("Bad Request"), body);
        assert_eq!(err.details.as_deref(), Some("e"));
    }

    #[test]
    fn non_json_body_keeps_status_text() {
        let err = ApiError::from_response_parts(502, Some("Bad Gateway"), b"<html>oops</html>");
        assert_eq!(err.error, "Bad Gateway");
        assert_eq!(err.status, 502);
        assert!(err.details.is_none());
    }

    #[test]
    fn blank_status_text_is_unknown() {
        let err = ApiError::from_response_parts(599, Some("  "), b"");
        assert_eq!(err.error, "Unknown Error");

        let err = ApiError::from_response_parts(599, None, b"");
        assert_eq!(err.error, "Unknown Error");
    }

    #[test]
    fn retry_classification_boundary() {
        let client_err = FetchError::from(ApiError::from_response_parts(499, None, b""));
        assert!(!client_err.is_retryable());

        let server_err = FetchError::from(ApiError::from_response_parts(500, None, b""));
        assert!(server_err.is_retryable());

        let timeout = FetchError::Timeout {
            timeout: Duration::from_secs(30),
        };
        assert!(timeout.is_retryable());

        let decode = FetchError::Decode(serde_json::from_str::<Value>("{").unwrap_err());
        assert!(!decode.is_retryable());
    }

    #[test]
    fn serialises_without_empty_details() {
        let err = ApiError::from_response_parts(404, Some("Not Found"), b"");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["error"], "Not Found");
        assert_eq!(json["status"], 404);
        assert!(json.get("details").is_none());
        assert!(json["hint"].as_str().unwrap().contains("not found"));
    }

    #[test]
    fn display_includes_details_and_hint() {
        let body = br#"{"message": "Invalid token"}"#;
        let err = FetchError::from(ApiError::from_response_parts(401, Some("Unauthorized"), body));
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("Invalid token"));
        assert!(msg.contains("API key"));
    }
}
