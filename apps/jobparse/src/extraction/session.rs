//! One extraction session: posting → chunks → index → summary → extractions.
//!
//! Sessions are one-shot. Each owns its index and summary exclusively and is
//! dropped with them; nothing is shared between sessions.
//!
//! A failed summarize caches nothing but keeps the posting and index, so the
//! same session can retry `summarize` without fetching again.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::errors::PipelineError;
use crate::extraction::chunker::TextChunker;
use crate::extraction::extractor::{ExtractionEngine, ExtractionRecord};
use crate::extraction::index::VectorIndex;
use crate::extraction::prompts::JOB_DESCRIPTION_QUERY;
use crate::extraction::summarizer::SummarizationChain;
use crate::fetch::{JobFetcher, JobPosting};
use crate::llm_client::LanguageModel;

pub struct JobSession {
    id: Uuid,
    llm: Arc<dyn LanguageModel>,
    config: PipelineConfig,
    posting: Option<JobPosting>,
    index: Option<VectorIndex>,
    summary: Option<String>,
}

impl JobSession {
    pub fn new(llm: Arc<dyn LanguageModel>, config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            llm,
            config,
            posting: None,
            index: None,
            summary: None,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn posting(&self) -> Option<&JobPosting> {
        self.posting.as_ref()
    }

    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    /// The cached job description summary, once `summarize` has succeeded.
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Chunks `text` and builds this session's index. Allowed once per session.
    /// Returns the number of chunks indexed.
    pub async fn index_text(&mut self, text: &str) -> Result<usize, PipelineError> {
        if self.index.is_some() {
            return Err(PipelineError::Precondition(
                "job posting already indexed; start a new session".to_string(),
            ));
        }

        let (chunks, tokens) = {
            let chunker = TextChunker::new(self.config.chunk_size, self.config.chunk_overlap)?;
            (chunker.chunk(text), chunker.count_tokens(text))
        };
        if chunks.is_empty() {
            return Err(PipelineError::Fetch(
                "job posting contained no text".to_string(),
            ));
        }

        let index = VectorIndex::build(chunks, self.llm.as_ref()).await?;
        let count = index.len();
        info!(
            "Session {}: indexed {} chunks from {} tokens (dimension {})",
            self.id,
            count,
            tokens,
            index.dimension()
        );

        self.index = Some(index);
        Ok(count)
    }

    /// Runs the summarization chain for `query` and caches the result.
    ///
    /// Succeeds at most once. The cache is written only when both stages
    /// succeed, so a failed attempt may be repeated.
    pub async fn summarize(&mut self, query: &str) -> Result<&str, PipelineError> {
        if self.summary.is_some() {
            return Err(PipelineError::Precondition(
                "job description already summarized; start a new session".to_string(),
            ));
        }
        let index = self.index.as_ref().ok_or_else(|| {
            PipelineError::Precondition("no job posting indexed; run fetch first".to_string())
        })?;

        let summary = SummarizationChain::new(
            self.llm.as_ref(),
            index,
            &self.config.summarize_template,
            self.config.retrieval_k,
        )
        .summarize(query)
        .await?;
        info!("Session {}: cached summary ({} chars)", self.id, summary.len());

        Ok(self.summary.insert(summary).as_str())
    }

    /// Indexes caller-supplied posting text and summarizes it. Skips the browser.
    pub async fn load_from_text(&mut self, text: &str) -> Result<&str, PipelineError> {
        self.index_text(text).await?;
        self.summarize(JOB_DESCRIPTION_QUERY).await
    }

    /// Fetches `url`, indexes its text and summarizes it.
    pub async fn load_from_url(
        &mut self,
        fetcher: &JobFetcher,
        url: &str,
    ) -> Result<&str, PipelineError> {
        if self.is_indexed() {
            return Err(PipelineError::Precondition(
                "job posting already indexed; start a new session".to_string(),
            ));
        }

        let posting = fetcher.fetch(url).await?;
        info!(
            "Session {}: fetched {} ({} bytes of markup, {} chars of text)",
            self.id,
            posting.url,
            posting.markup.len(),
            posting.text.len()
        );
        self.index_text(&posting.text).await?;
        self.posting = Some(posting);
        self.summarize(JOB_DESCRIPTION_QUERY).await
    }

    /// Extraction engine bound to this session's summary. Every call on it
    /// fails with a precondition error until `summarize` has succeeded.
    pub fn extractor(&self) -> ExtractionEngine<'_> {
        ExtractionEngine::new(
            self.llm.as_ref(),
            &self.config.extraction_template,
            self.summary.as_deref(),
        )
    }

    pub async fn extract_all(&self) -> Result<ExtractionRecord, PipelineError> {
        self.extractor().extract_all().await
    }
}
