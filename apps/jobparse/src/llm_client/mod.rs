//! LLM Client: the single point of entry for all completion and embedding calls.
//!
//! ARCHITECTURAL RULE: No other module may call the OpenAI API directly.
//! Pipeline code depends on the `LanguageModel` trait only; `OpenAiClient` is
//! the production implementation injected at startup.
//!
//! Models: gpt-4o-mini at temperature 0.4 for completions, ada-002 for embeddings.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::RETRY_AFTER, Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::PipelineError;

pub mod prompts;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Chat model used for every completion.
pub const MODEL: &str = "gpt-4o-mini";
/// Embedding model used for chunk and query vectors.
pub const EMBEDDING_MODEL: &str = "text-embedding-ada-002";
const TEMPERATURE: f32 = 0.4;
const EMBED_BATCH_SIZE: usize = 96;
const MAX_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Completion and embedding capabilities the pipeline needs from a model provider.
///
/// Implementations are shared across sessions behind an `Arc`, so they must be
/// `Send + Sync`. Each call is independent; the pipeline never retries.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns the model's text completion for `prompt`.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;

    /// Returns a fixed-dimension embedding of `text`.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError>;

    /// Embeds every input, preserving order. Providers with a batch endpoint override this.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

/// Connection settings for `OpenAiClient`. `Debug` never prints the key.
#[derive(Clone)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub base_url: String,
    /// Attempts per call (1 = no retry).
    pub max_retries: u32,
}

impl OpenAiSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_retries: 3,
        }
    }
}

impl fmt::Debug for OpenAiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

/// OpenAI-backed `LanguageModel`.
/// Wraps the Chat Completions and Embeddings APIs with rate-limit aware retries.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    max_retries: u32,
}

impl OpenAiClient {
    /// Builds a client. An empty key is a configuration error, not a runtime one.
    pub fn new(settings: OpenAiSettings) -> Result<Self, PipelineError> {
        if settings.api_key.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "OpenAI API key is missing".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| PipelineError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: settings.api_key.trim().to_string(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            max_retries: settings.max_retries.max(1),
        })
    }

    /// POSTs `body` to `{base_url}/{path}` and decodes the JSON reply.
    /// Retries on 429 (rate limit) and 5xx errors, honouring `Retry-After` when sent.
    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, LlmError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);
        let mut last_error: Option<LlmError> = None;
        let mut retry_after: Option<Duration> = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s unless the server said otherwise
                let delay = retry_after
                    .take()
                    .unwrap_or_else(|| Duration::from_millis(1000 * (1 << (attempt - 1).min(5))));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                retry_after = parse_retry_after(response.headers().get(RETRY_AFTER));
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message: error_message(&body),
                });
            }

            let text = response.text().await?;
            return serde_json::from_str(&text).map_err(LlmError::Parse);
        }

        match last_error {
            Some(LlmError::Api { status: 429, .. }) | None => Err(LlmError::RateLimited {
                retries: self.max_retries,
            }),
            Some(e) => Err(e),
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: MODEL,
            temperature: TEMPERATURE,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response: ChatResponse = self.post_json("chat/completions", &request).await?;

        if let Some(usage) = &response.usage {
            debug!(
                "LLM call succeeded: prompt_chars={}, prompt_tokens={}, completion_tokens={}",
                prompt.len(),
                usage.prompt_tokens,
                usage.completion_tokens
            );
        }

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyContent)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or(LlmError::EmptyContent)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            let request = EmbeddingRequest {
                model: EMBEDDING_MODEL,
                input: batch,
            };
            let mut response: EmbeddingResponse = self.post_json("embeddings", &request).await?;
            if response.data.len() != batch.len() {
                return Err(LlmError::MalformedResponse(format!(
                    "provider returned {} embeddings for {} inputs",
                    response.data.len(),
                    batch.len()
                )));
            }
            response.data.sort_by_key(|entry| entry.index);
            vectors.extend(response.data.into_iter().map(|entry| entry.embedding));
        }

        debug!("Embedded {} inputs", texts.len());
        Ok(vectors)
    }
}

/// Reads a `Retry-After` header given in whole seconds, capped.
fn parse_retry_after(value: Option<&reqwest::header::HeaderValue>) -> Option<Duration> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(|secs| Duration::from_secs(secs.min(MAX_RETRY_AFTER_SECS)))
}

/// Pulls the human-readable message out of an OpenAI error body, if it is one.
fn error_message(body: &str) -> String {
    serde_json::from_str::<OpenAiError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}
