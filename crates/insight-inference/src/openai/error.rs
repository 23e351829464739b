//! Mapping of HTTP client failures onto [`GatewayError`].

use insight_core::GatewayError;

/// Coarse classification of a non-success status, used for logging only.
/// The stored value is always the raw response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAIErrorCode {
    /// Invalid or missing credentials.
    AuthenticationError,
    /// Rate limit exceeded.
    RateLimitExceeded,
    /// Model not found or not available.
    ModelNotFound,
    /// Server error.
    ServerError,
    /// Anything else.
    Unknown,
}

impl OpenAIErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::AuthenticationError,
            429 => Self::RateLimitExceeded,
            404 => Self::ModelNotFound,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }
}

/// Failure while sending the request or reading the body.
pub fn transport_error(e: reqwest::Error) -> GatewayError {
    let kind = if e.is_timeout() {
        "timed out"
    } else if e.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    GatewayError::Transport(format!("{}: {}", kind, e))
}

/// Success status whose body did not match the expected shape.
pub fn decode_error(e: serde_json::Error) -> GatewayError {
    GatewayError::Decode(e.to_string())
}
