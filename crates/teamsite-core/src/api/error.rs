//! Structured errors returned by backend calls.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Categories of API errors for consistent handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    /// 401 from the backend (expired or invalid token, bad credentials)
    Unauthorized,
    /// Any other non-success HTTP status (4xx, 5xx)
    HttpStatus,
    /// Connection failure
    Network,
    /// Request timed out
    Timeout,
    /// Response body could not be decoded
    Parse,
    /// Operation needs tokens the session does not hold
    NotAuthenticated,
    /// Client-side capability check failed (e.g. not a team leader)
    NotPermitted,
    /// The session changed while the request was in flight; result discarded
    SessionEnded,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ApiErrorKind::Unauthorized => "unauthorized",
            ApiErrorKind::HttpStatus => "http_status",
            ApiErrorKind::Network => "network",
            ApiErrorKind::Timeout => "timeout",
            ApiErrorKind::Parse => "parse",
            ApiErrorKind::NotAuthenticated => "not_authenticated",
            ApiErrorKind::NotPermitted => "not_permitted",
            ApiErrorKind::SessionEnded => "session_ended",
        };
        f.write_str(label)
    }
}

/// Error from a backend call, with a one-line message for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error category
    pub kind: ApiErrorKind,
    /// HTTP status, when the backend answered
    pub status: Option<u16>,
    /// One-line summary suitable for display
    pub message: String,
    /// Decoded error body (e.g. per-field validation errors)
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
            details: None,
        }
    }

    /// Builds an error from a non-success response.
    ///
    /// The message comes from the body's `error`, `detail` or `message`
    /// field when present (the backend uses all three), else `HTTP {status}`.
    pub fn http_status(status: u16, body: &str) -> Self {
        let kind = if status == 401 {
            ApiErrorKind::Unauthorized
        } else {
            ApiErrorKind::HttpStatus
        };

        let details = serde_json::from_str::<Value>(body).ok();
        let extracted = details.as_ref().and_then(|json| {
            ["error", "detail", "message"]
                .iter()
                .find_map(|key| json.get(*key).and_then(Value::as_str))
                .map(str::to_string)
        });

        let details = details.or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| Value::String(trimmed.to_string()))
        });

        Self {
            kind,
            status: Some(status),
            message: extracted.unwrap_or_else(|| format!("HTTP {status}")),
            details,
        }
    }

    /// Wraps a transport error from reqwest.
    pub fn transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ApiErrorKind::Timeout, format!("Request timed out: {err}"))
        } else if err.is_decode() {
            Self::new(ApiErrorKind::Parse, format!("Failed to decode response: {err}"))
        } else {
            Self::new(ApiErrorKind::Network, format!("Request failed: {err}"))
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Parse, message)
    }

    pub fn not_authenticated() -> Self {
        Self::new(ApiErrorKind::NotAuthenticated, "Not signed in")
    }

    pub fn not_permitted(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::NotPermitted, message)
    }

    pub fn session_ended() -> Self {
        Self::new(
            ApiErrorKind::SessionEnded,
            "Session changed before the request completed",
        )
    }

    /// Replaces the message with `fallback` when the backend gave no text.
    #[must_use]
    pub fn with_fallback_message(mut self, fallback: &str) -> Self {
        let generic = self
            .status
            .is_some_and(|status| self.message == format!("HTTP {status}"));
        if generic || self.message.trim().is_empty() {
            self.message = fallback.to_string();
        }
        self
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ApiErrorKind::Unauthorized
    }

    /// Per-field messages from a validation error body, sorted by field.
    ///
    /// The backend sends `{ "field": ["msg", ...], ... }`.
    pub fn field_errors(&self) -> Vec<(String, String)> {
        let Some(Value::Object(map)) = &self.details else {
            return Vec::new();
        };

        let mut fields: Vec<(String, String)> = map
            .iter()
            .filter_map(|(field, value)| {
                let text = match value {
                    Value::String(s) => s.clone(),
                    Value::Array(items) => items
                        .iter()
                        .filter_map(Value::as_str)
                        .collect::<Vec<_>>()
                        .join(" "),
                    _ => return None,
                };
                (!text.is_empty()).then(|| (field.clone(), text))
            })
            .collect();
        fields.sort();
        fields
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
