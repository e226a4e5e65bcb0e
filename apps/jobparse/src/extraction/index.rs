//! Vector Index: flat, in-memory cosine similarity index over one posting's chunks.
//!
//! Built fresh per session and dropped with it. Brute force is fine here:
//! a single job posting produces a handful of chunks.

use std::cmp::Ordering;

use tracing::debug;

use crate::errors::PipelineError;
use crate::extraction::chunker::{Chunk, ChunkSet};
use crate::llm_client::{LanguageModel, LlmError};

struct IndexedChunk {
    chunk: Chunk,
    embedding: Vec<f32>,
}

/// A retrieved chunk and its similarity to the query.
#[derive(Debug, Clone, Copy)]
pub struct SearchHit<'a> {
    pub chunk: &'a Chunk,
    pub score: f32,
}

pub struct VectorIndex {
    entries: Vec<IndexedChunk>,
    dimension: usize,
}

impl VectorIndex {
    /// Embeds every chunk with `llm` and indexes the results.
    pub async fn build(chunks: ChunkSet, llm: &dyn LanguageModel) -> Result<Self, PipelineError> {
        let embeddings = llm.embed_batch(&chunks.texts()).await?;
        let index = Self::from_embeddings(chunks, embeddings)?;
        debug!(
            "Vector index built: {} chunks (largest {} tokens), dimension {}",
            index.len(),
            index.entries.iter().map(|e| e.chunk.token_len()).max().unwrap_or(0),
            index.dimension
        );
        Ok(index)
    }

    /// Pairs chunks with precomputed embeddings. Counts and dimensions must agree.
    pub fn from_embeddings(
        chunks: ChunkSet,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Self, PipelineError> {
        if chunks.len() != embeddings.len() {
            return Err(malformed(format!(
                "{} embeddings for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let dimension = embeddings.first().map(Vec::len).unwrap_or(0);
        if embeddings.iter().any(|e| e.len() != dimension || e.is_empty()) {
            return Err(malformed(
                "embeddings have inconsistent dimensions".to_string(),
            ));
        }

        let entries = chunks
            .iter()
            .cloned()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexedChunk { chunk, embedding })
            .collect();

        Ok(Self { entries, dimension })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Returns up to `k` chunks by descending similarity. Ties keep chunk order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit<'_>>, PipelineError> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(malformed(format!(
                "query embedding has dimension {}, index has {}",
                query.len(),
                self.dimension
            )));
        }

        let mut hits: Vec<SearchHit<'_>> = self
            .entries
            .iter()
            .map(|entry| SearchHit {
                chunk: &entry.chunk,
                score: cosine_similarity(query, &entry.embedding),
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a > 0.0 && mag_b > 0.0 {
        dot_product / (mag_a * mag_b)
    } else {
        0.0
    }
}

fn malformed(message: String) -> PipelineError {
    PipelineError::ModelInvocation(LlmError::MalformedResponse(message))
}
