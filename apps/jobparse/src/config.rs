use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::errors::PipelineError;
use crate::extraction::prompts::{DEFAULT_EXTRACTION_TEMPLATE, DEFAULT_SUMMARIZE_TEMPLATE};
use crate::llm_client::prompts::{has_placeholder, preprocess_template};
use crate::llm_client::OpenAiSettings;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai: OpenAiSettings,
    pub webdriver_url: String,
    pub pipeline: PipelineConfig,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let mut openai = OpenAiSettings::new(require_env("OPENAI_API_KEY")?);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            openai.base_url = base_url;
        }
        openai.max_retries = parse_env("LLM_MAX_RETRIES", 3)?;

        let summarize_template = match std::env::var("SUMMARIZE_PROMPT_PATH") {
            Ok(path) => read_template(&path)?,
            Err(_) => DEFAULT_SUMMARIZE_TEMPLATE.to_string(),
        };
        let extraction_template = match std::env::var("EXTRACTION_PROMPT_PATH") {
            Ok(path) => read_template(&path)?,
            Err(_) => DEFAULT_EXTRACTION_TEMPLATE.to_string(),
        };

        let mut pipeline = PipelineConfig::new(&summarize_template, &extraction_template)?;
        pipeline.settle_delay = Duration::from_secs(parse_env("PAGE_SETTLE_SECS", 3)?);

        Ok(Config {
            openai,
            webdriver_url: std::env::var("WEBDRIVER_URL")
                .unwrap_or_else(|_| "http://localhost:4444".to_string()),
            pipeline,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Settings owned by a single extraction session.
///
/// Replaces process-wide configuration so sessions stay independent and can run
/// side by side with different templates.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum tokens per chunk.
    pub chunk_size: usize,
    /// Tokens shared by consecutive chunks. Must be smaller than `chunk_size`.
    pub chunk_overlap: usize,
    /// Chunks retrieved per summarization query.
    pub retrieval_k: usize,
    /// Wait after navigation so client-side rendering can finish.
    pub settle_delay: Duration,
    /// Stage-2 template; receives the stage-1 answer as `{text}`.
    pub summarize_template: String,
    /// Extraction template; receives `{job_description}` and `{question}`.
    pub extraction_template: String,
    /// Directory for fetch temp files. System temp dir when `None`.
    pub scratch_dir: Option<PathBuf>,
}

impl PipelineConfig {
    /// Builds a config with the default sizes and the given (dedented) templates.
    pub fn new(summarize_template: &str, extraction_template: &str) -> Result<Self, PipelineError> {
        let config = Self {
            summarize_template: preprocess_template(summarize_template),
            extraction_template: preprocess_template(extraction_template),
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.chunk_size == 0 {
            return Err(PipelineError::Configuration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(PipelineError::Configuration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.retrieval_k == 0 {
            return Err(PipelineError::Configuration(
                "retrieval_k must be greater than zero".to_string(),
            ));
        }
        if !has_placeholder(&self.summarize_template, "text") {
            return Err(PipelineError::Configuration(
                "summarize template must contain a {text} placeholder".to_string(),
            ));
        }
        for name in ["job_description", "question"] {
            if !has_placeholder(&self.extraction_template, name) {
                return Err(PipelineError::Configuration(format!(
                    "extraction template must contain a {{{name}}} placeholder"
                )));
            }
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            retrieval_k: 4,
            settle_delay: Duration::from_secs(3),
            summarize_template: preprocess_template(DEFAULT_SUMMARIZE_TEMPLATE),
            extraction_template: preprocess_template(DEFAULT_EXTRACTION_TEMPLATE),
            scratch_dir: None,
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number")),
        Err(_) => Ok(default),
    }
}

fn read_template(path: &str) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read prompt template '{path}'"))
}
