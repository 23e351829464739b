//! Error types for the insight pipeline.

use thiserror::Error;

use crate::defaults::NO_CHOICES_MESSAGE;

/// Result type alias using the pipeline's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for pipeline operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Inference/generation failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// Job queue error
    #[error("Job error: {0}")]
    Job(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Upstream data source (issue tracker) failed
    #[error("Issue source error: {0}")]
    IssueSource(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

/// Failure returned by an [`LlmGateway`](crate::LlmGateway) call.
///
/// The consumer collapses the first two variants into stored insight text
/// (see [`GatewayError::into_stored_text`]); the remaining variants never
/// reach the dataset and cause the job to be re-delivered instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Endpoint answered with a non-success status. `body` is the raw text.
    #[error("gateway returned HTTP {status}")]
    Status { status: u16, body: String },

    /// Endpoint answered 200 with an empty `choices` array.
    #[error("gateway response did not include any choices")]
    NoChoices,

    /// Request never completed (connect, TLS, timeout).
    #[error("gateway transport error: {0}")]
    Transport(String),

    /// 200 response whose body could not be decoded.
    #[error("gateway response could not be decoded: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Text persisted in place of a generated insight, if this failure is
    /// stored as data. Returns `None` for failures that should be retried.
    pub fn into_stored_text(self) -> Option<String> {
        match self {
            GatewayError::Status { body, .. } => Some(body),
            GatewayError::NoChoices => Some(NO_CHOICES_MESSAGE.to_string()),
            GatewayError::Transport(_) | GatewayError::Decode(_) => None,
        }
    }

    /// Whether the job that hit this failure should be re-delivered.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Transport(_) | GatewayError::Decode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("test resource".to_string());
        assert_eq!(err.to_string(), "Not found: test resource");
    }

    #[test]
    fn test_error_display_job() {
        let err = Error::Job("queue full".to_string());
        assert_eq!(err.to_string(), "Job error: queue full");
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("skill level 11".to_string());
        assert_eq!(err.to_string(), "Invalid input: skill level 11");
    }

    #[test]
    fn test_error_display_issue_source() {
        let err = Error::IssueSource("HTTP 403".to_string());
        assert_eq!(err.to_string(), "Issue source error: HTTP 403");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
        assert_send::<GatewayError>();
        assert_sync::<GatewayError>();
    }

    #[test]
    fn test_status_error_stores_raw_body() {
        let err = GatewayError::Status {
            status: 401,
            body: "invalid api key".to_string(),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.into_stored_text().as_deref(), Some("invalid api key"));
    }

    #[test]
    fn test_no_choices_stores_placeholder() {
        assert_eq!(
            GatewayError::NoChoices.into_stored_text().as_deref(),
            Some(NO_CHOICES_MESSAGE)
        );
    }

    #[test]
    fn test_transport_error_is_not_stored() {
        let err = GatewayError::Transport("connection refused".to_string());
        assert!(err.is_retryable());
        assert!(err.into_stored_text().is_none());
    }

    #[test]
    fn test_decode_error_is_not_stored() {
        let err = GatewayError::Decode("expected value at line 1".to_string());
        assert!(err.is_retryable());
        assert!(err.into_stored_text().is_none());
    }
}
