mod config;
mod errors;
mod extraction;
mod fetch;
mod llm_client;
mod routes;
mod state;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::fetch::browser::WebDriverLauncher;
use crate::llm_client::OpenAiClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting jobparse v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = OpenAiClient::new(config.openai.clone())?;
    info!(
        "LLM client initialized (model: {}, embeddings: {})",
        llm_client::MODEL,
        llm_client::EMBEDDING_MODEL
    );

    // Initialize browser launcher; sessions are created per fetch
    let launcher = WebDriverLauncher::new(&config.webdriver_url)?;
    info!("WebDriver endpoint: {}", config.webdriver_url);

    info!(
        "Pipeline: chunk {} / overlap {} tokens, k={}, settle {:?}",
        config.pipeline.chunk_size,
        config.pipeline.chunk_overlap,
        config.pipeline.retrieval_k,
        config.pipeline.settle_delay
    );

    let state = AppState {
        llm: Arc::new(llm),
        launcher: Arc::new(launcher),
        pipeline: config.pipeline.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the document layer's host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
