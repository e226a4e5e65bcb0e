//! Axum route handlers for the job parsing API.
//!
//! Each request builds a fresh `JobSession`; nothing survives the request.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::extractor::{ExtractionEngine, ExtractionRecord};
use crate::extraction::session::JobSession;
use crate::fetch::JobFetcher;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ParseUrlRequest {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ParseTextRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ParseResponse {
    pub session_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
    pub summary: String,
    pub details: ExtractionRecord,
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub summary: String,
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub answer: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/jobs/parse
///
/// Full pipeline: browser fetch → chunk/index → summarize → extract all fields.
pub async fn handle_parse_url(
    State(state): State<AppState>,
    Json(request): Json<ParseUrlRequest>,
) -> Result<Json<ParseResponse>, AppError> {
    let url = validate_url(&request.url)?;

    let fetcher = JobFetcher::new(state.launcher.clone(), &state.pipeline);
    let mut session = JobSession::new(state.llm.clone(), state.pipeline.clone())?;
    let summary = session.load_from_url(&fetcher, url.as_str()).await?.to_string();
    let details = session.extract_all().await?;

    let posting = session.posting();
    Ok(Json(ParseResponse {
        session_id: session.id(),
        url: posting.map(|p| p.url.clone()),
        fetched_at: posting.map(|p| p.fetched_at),
        summary,
        details,
    }))
}

/// POST /api/v1/jobs/parse-text
///
/// Same pipeline for posting text the caller already has. No browser involved.
pub async fn handle_parse_text(
    State(state): State<AppState>,
    Json(request): Json<ParseTextRequest>,
) -> Result<Json<ParseResponse>, AppError> {
    if request.text.trim().is_empty() {
        return Err(AppError::Validation("text cannot be empty".to_string()));
    }

    let mut session = JobSession::new(state.llm.clone(), state.pipeline.clone())?;
    let summary = session.load_from_text(&request.text).await?.to_string();
    let details = session.extract_all().await?;

    Ok(Json(ParseResponse {
        session_id: session.id(),
        url: None,
        fetched_at: None,
        summary,
        details,
    }))
}

/// POST /api/v1/jobs/summary/extract
///
/// Asks one question against a summary returned by an earlier parse.
pub async fn handle_extract_from_summary(
    State(state): State<AppState>,
    Json(request): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, AppError> {
    if request.summary.trim().is_empty() {
        return Err(AppError::Validation("summary cannot be empty".to_string()));
    }
    if request.question.trim().is_empty() {
        return Err(AppError::Validation("question cannot be empty".to_string()));
    }

    let engine = ExtractionEngine::new(
        state.llm.as_ref(),
        &state.pipeline.extraction_template,
        Some(&request.summary),
    );
    let answer = engine.extract(request.question.trim()).await?;

    Ok(Json(ExtractResponse { answer }))
}

/// Accepts absolute http(s) URLs with a host.
fn validate_url(raw: &str) -> Result<Url, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::Validation("url cannot be empty".to_string()));
    }

    let url = Url::parse(raw).map_err(|e| AppError::Validation(format!("invalid url: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::Validation(format!(
            "unsupported url scheme '{}'",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(AppError::Validation("url must include a host".to_string()));
    }
    Ok(url)
}
