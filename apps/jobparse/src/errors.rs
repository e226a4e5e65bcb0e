use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;

/// Failure taxonomy of the extraction pipeline.
///
/// Every variant surfaces to the immediate caller. Nothing in the pipeline
/// swallows or retries these; the only guaranteed cleanup on the error path is
/// the temporary file created while fetching.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Bad or missing credentials, unusable templates, tokenizer/HTTP client init failure.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Browser session could not be created or the page failed to load.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// A completion or embedding call failed (network, rate limit, malformed response).
    #[error("Model invocation error: {0}")]
    ModelInvocation(#[from] LlmError),

    /// An operation ran before (or after) the session state it depends on.
    #[error("Precondition failed: {0}")]
    Precondition(String),
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Pipeline(PipelineError::Configuration(msg)) => {
                tracing::error!("Configuration error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONFIGURATION_ERROR",
                    "The extraction pipeline is misconfigured".to_string(),
                )
            }
            AppError::Pipeline(PipelineError::Fetch(msg)) => {
                tracing::warn!("Fetch error: {msg}");
                (StatusCode::BAD_GATEWAY, "FETCH_ERROR", msg.clone())
            }
            AppError::Pipeline(PipelineError::ModelInvocation(e)) => {
                tracing::error!("LLM error: {e}");
                let status = match e {
                    LlmError::RateLimited { .. } | LlmError::Api { status: 429, .. } => {
                        StatusCode::TOO_MANY_REQUESTS
                    }
                    _ => StatusCode::BAD_GATEWAY,
                };
                (
                    status,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::Pipeline(PipelineError::Precondition(msg)) => {
                (StatusCode::CONFLICT, "PRECONDITION_FAILED", msg.clone())
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
