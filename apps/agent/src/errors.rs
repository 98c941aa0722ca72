use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::browser::BrowserError;
use crate::inference::ServiceError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Browser unavailable: {0}")]
    BrowserUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::BrowserUnavailable(e) => AppError::BrowserUnavailable(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::BrowserUnavailable(msg) => {
                tracing::error!("Browser unavailable: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "BROWSER_UNAVAILABLE",
                    "The search browser could not be started".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

/// Failure of a single pipeline stage. Never crosses a stage boundary:
/// the orchestrator turns it into a sentinel value plus a notifier message.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("service unavailable: {0}")]
    ServiceUnavailable(#[from] ServiceError),

    #[error("generation was empty after cleaning")]
    EmptyGeneration,

    #[error("element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("timed out after {}s waiting for {what}", after.as_secs_f32())]
    Timeout { what: &'static str, after: Duration },

    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("invalid site url: {0}")]
    InvalidSiteUrl(#[from] url::ParseError),
}

/// The only failure that aborts a whole pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("browser session could not be started: {0}")]
    BrowserUnavailable(BrowserError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_names_the_wait() {
        let err = StageError::Timeout {
            what: "search input",
            after: Duration::from_secs(10),
        };
        assert_eq!(err.to_string(), "timed out after 10s waiting for search input");
    }

    #[test]
    fn test_validation_maps_to_bad_request() {
        let response = AppError::Validation("tags cannot be empty".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_browser_unavailable_maps_to_503() {
        let err: AppError =
            PipelineError::BrowserUnavailable(BrowserError::Launch("no chrome".into())).into();
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
