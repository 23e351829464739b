//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Internal(insight_core::Error),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    /// The issue tracker failed or is not configured.
    #[error("{0}")]
    Upstream(String),
}

impl From<insight_core::Error> for ApiError {
    fn from(err: insight_core::Error) -> Self {
        match err {
            insight_core::Error::NotFound(msg) => ApiError::NotFound(msg),
            insight_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            insight_core::Error::IssueSource(msg) => ApiError::Upstream(msg),
            other => ApiError::Internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Internal(err) => {
                error!(error = %err, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_map_to_status() {
        let cases = [
            (insight_core::Error::NotFound("x".into()), StatusCode::NOT_FOUND),
            (insight_core::Error::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (insight_core::Error::IssueSource("x".into()), StatusCode::BAD_GATEWAY),
            (insight_core::Error::Job("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }
}
