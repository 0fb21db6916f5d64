//! Failures reported by upstream platform calls.

use std::collections::BTreeMap;

/// Error returned by a platform call executed inside a dispatched task.
///
/// Carries the parts of a failed response that error classifiers look at:
/// the HTTP status, the platform's own error code (Graph API `error.code`,
/// X API `errors[].code`), response headers and the decoded body.
///
/// Header names are stored lowercased.
///
/// # Examples
///
/// ```
/// use plume_error::UpstreamError;
///
/// let err = UpstreamError::new("Too Many Requests")
///     .with_status(429)
///     .with_header("X-Rate-Limit-Reset", "1700000000");
///
/// assert_eq!(err.status, Some(429));
/// assert_eq!(err.header("x-rate-limit-reset"), Some("1700000000"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Upstream Error: {} at line {} in {}", message, line, file)]
pub struct UpstreamError {
    /// Human-readable error message
    pub message: String,
    /// HTTP status code, when the failure came from a response
    pub status: Option<u16>,
    /// Platform-specific error code
    pub code: Option<i64>,
    /// Platform-specific error subcode
    pub subcode: Option<i64>,
    /// Response headers (lowercased names)
    pub headers: BTreeMap<String, String>,
    /// Decoded response body, if it was JSON
    pub body: Option<serde_json::Value>,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl UpstreamError {
    /// Create a new UpstreamError with the given message at the current location.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            status: None,
            code: None,
            subcode: None,
            headers: BTreeMap::new(),
            body: None,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Set the HTTP status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Set the platform error code.
    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    /// Set the platform error subcode.
    pub fn with_subcode(mut self, subcode: i64) -> Self {
        self.subcode = Some(subcode);
        self
    }

    /// Add a response header.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Attach a decoded response body.
    ///
    /// Graph API (`{"error": {"code": .., "error_subcode": .., "message": ..}}`)
    /// and X API (`{"errors": [{"code": .., "message": ..}]}`) error shapes
    /// fill in `code`, `subcode` and `message` when those are still unset.
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        if let Some(error) = body.get("error") {
            if self.code.is_none() {
                self.code = error.get("code").and_then(serde_json::Value::as_i64);
            }
            if self.subcode.is_none() {
                self.subcode = error
                    .get("error_subcode")
                    .and_then(serde_json::Value::as_i64);
            }
            if let Some(message) = error.get("message").and_then(serde_json::Value::as_str) {
                self.message = message.to_string();
            }
        } else if let Some(first) = body
            .get("errors")
            .and_then(serde_json::Value::as_array)
            .and_then(|errors| errors.first())
        {
            if self.code.is_none() {
                self.code = first.get("code").and_then(serde_json::Value::as_i64);
            }
            if let Some(message) = first.get("message").and_then(serde_json::Value::as_str) {
                self.message = message.to_string();
            }
        } else if let Some(detail) = body.get("detail").and_then(serde_json::Value::as_str) {
            self.message = detail.to_string();
        }
        self.body = Some(body);
        self
    }

    /// Look up a header by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for UpstreamError {
    #[track_caller]
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        let upstream = Self::new(err.to_string());
        match status {
            Some(status) => upstream.with_status(status),
            None => upstream,
        }
    }
}

#[cfg(feature = "http")]
impl UpstreamError {
    /// Build an error from a failed HTTP response.
    ///
    /// Captures the status and headers, then reads the body and decodes it
    /// as JSON when possible.
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let reason = status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string();

        let mut upstream = Self::new(format!("HTTP {}: {}", status.as_u16(), reason))
            .with_status(status.as_u16());
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                upstream = upstream.with_header(name.as_str(), value);
            }
        }

        match response.text().await {
            Ok(text) => match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(body) => upstream.with_body(body),
                Err(_) if !text.is_empty() => {
                    upstream.message = format!("{}: {}", upstream.message, text);
                    upstream
                }
                Err(_) => upstream,
            },
            Err(_) => upstream,
        }
    }
}
