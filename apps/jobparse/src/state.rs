use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::fetch::browser::BrowserLauncher;
use crate::llm_client::LanguageModel;

/// Shared application state injected into all route handlers via Axum extractors.
/// Holds only collaborators; every request builds its own `JobSession`.
#[derive(Clone)]
pub struct AppState {
    pub llm: Arc<dyn LanguageModel>,
    pub launcher: Arc<dyn BrowserLauncher>,
    /// Template and chunking settings copied into each new session.
    pub pipeline: PipelineConfig,
}
