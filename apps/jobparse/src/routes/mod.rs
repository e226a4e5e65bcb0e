pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::extraction::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/jobs/parse", post(handlers::handle_parse_url))
        .route("/api/v1/jobs/parse-text", post(handlers::handle_parse_text))
        .route(
            "/api/v1/jobs/summary/extract",
            post(handlers::handle_extract_from_summary),
        )
        .with_state(state)
}
