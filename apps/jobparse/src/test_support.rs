//! Deterministic stand-ins for the model provider and the browser, shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::errors::PipelineError;
use crate::fetch::browser::{BrowserLauncher, BrowserSession};
use crate::llm_client::{LanguageModel, LlmError};

/// Embedding width of `ScriptedModel`. Every distinct word gets its own axis.
pub const EMBEDDING_DIM: usize = 512;

pub const ACME_SUMMARY: &str =
    "Senior Backend Engineer at Acme Corp, Remote, contact: jobs@acme.com";

pub const ACME_POSTING: &str = "Acme Corp is hiring a Senior Backend Engineer. \
    The role is fully remote. You will build Rust services and own their reliability. \
    Questions? Contact jobs@acme.com.";

/// A `LanguageModel` that answers from a script.
///
/// Completions return the reply of the first rule whose needle occurs in the
/// prompt. Embeddings are bag-of-words counts over a vocabulary that grows as
/// words are seen, so unrelated texts are exactly orthogonal.
pub struct ScriptedModel {
    rules: Vec<(String, String)>,
    fallback: String,
    failures: Mutex<Vec<(String, usize)>>,
    fail_embeddings: bool,
    prompts: Mutex<Vec<String>>,
    vocabulary: Mutex<HashMap<String, usize>>,
    embed_calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            fallback: "I don't know".to_string(),
            failures: Mutex::new(Vec::new()),
            fail_embeddings: false,
            prompts: Mutex::new(Vec::new()),
            vocabulary: Mutex::new(HashMap::new()),
            embed_calls: AtomicUsize::new(0),
        }
    }

    /// Scripted model for the Acme posting: both chain stages and all four questions.
    /// Extraction replies carry stray whitespace on purpose.
    pub fn acme() -> Self {
        Self::new()
            .answer(
                "expert job description analyst",
                "Acme Corp is looking for a Senior Backend Engineer to work remotely. \
                 Applicants should contact jobs@acme.com.",
            )
            .answer("seasoned HR expert", ACME_SUMMARY)
            .answer("company name", "  Acme Corp\n")
            .answer("role or title", "Senior Backend Engineer ")
            .answer("location mentioned", "\tRemote")
            .answer("recruiter's email", "jobs@acme.com\n\n")
    }

    pub fn answer(mut self, needle: &str, reply: &str) -> Self {
        self.rules.push((needle.to_string(), reply.to_string()));
        self
    }

    /// The next `times` completions whose prompt contains `needle` fail with a 429.
    pub fn fail_on(self, needle: &str, times: usize) -> Self {
        self.failures
            .lock()
            .unwrap()
            .push((needle.to_string(), times));
        self
    }

    pub fn fail_embeddings(mut self) -> Self {
        self.fail_embeddings = true;
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn completion_calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(entry) = failures
                .iter_mut()
                .find(|(needle, remaining)| *remaining > 0 && prompt.contains(needle.as_str()))
            {
                entry.1 -= 1;
                return Err(LlmError::Api {
                    status: 429,
                    message: "Rate limit reached. Please try again in 20s.".to_string(),
                });
            }
        }

        Ok(self
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.fallback.clone()))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_embeddings {
            return Err(LlmError::Api {
                status: 503,
                message: "embedding service unavailable".to_string(),
            });
        }

        let mut vocabulary = self.vocabulary.lock().unwrap();
        let mut vector = vec![0.0; EMBEDDING_DIM];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let next = vocabulary.len();
            let slot = *vocabulary.entry(word.to_lowercase()).or_insert(next);
            if slot < EMBEDDING_DIM {
                vector[slot] += 1.0;
            }
        }
        Ok(vector)
    }
}

/// Records what a `ScriptedLauncher` was asked to do.
#[derive(Default)]
struct BrowserLog {
    navigated: Mutex<Vec<String>>,
    closed: AtomicUsize,
}

/// A `BrowserLauncher` whose sessions replay fixed markup or fail on demand.
pub struct ScriptedLauncher {
    body: String,
    fail_launch: bool,
    fail_navigation: bool,
    log: Arc<BrowserLog>,
}

impl ScriptedLauncher {
    pub fn with_body(body: &str) -> Self {
        Self {
            body: body.to_string(),
            fail_launch: false,
            fail_navigation: false,
            log: Arc::new(BrowserLog::default()),
        }
    }

    pub fn failing_launch() -> Self {
        Self {
            fail_launch: true,
            ..Self::with_body("")
        }
    }

    pub fn failing_navigation() -> Self {
        Self {
            fail_navigation: true,
            ..Self::with_body("")
        }
    }

    pub fn navigated(&self) -> Vec<String> {
        self.log.navigated.lock().unwrap().clone()
    }

    pub fn closed(&self) -> usize {
        self.log.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for ScriptedLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, PipelineError> {
        if self.fail_launch {
            return Err(PipelineError::Fetch(
                "Failed to create browser session: connection refused".to_string(),
            ));
        }
        Ok(Box::new(ScriptedSession {
            body: self.body.clone(),
            fail_navigation: self.fail_navigation,
            log: Arc::clone(&self.log),
        }))
    }
}

struct ScriptedSession {
    body: String,
    fail_navigation: bool,
    log: Arc<BrowserLog>,
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn navigate(&mut self, url: &str) -> Result<(), PipelineError> {
        self.log.navigated.lock().unwrap().push(url.to_string());
        if self.fail_navigation {
            return Err(PipelineError::Fetch(format!(
                "Failed to load {url}: net::ERR_NAME_NOT_RESOLVED"
            )));
        }
        Ok(())
    }

    async fn rendered_body(&mut self) -> Result<String, PipelineError> {
        Ok(self.body.clone())
    }

    async fn close(&mut self) -> Result<(), PipelineError> {
        self.log.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
