//! Retrieval Context Builder: turns a free-text question into prompt context.

use tracing::debug;

use crate::errors::PipelineError;
use crate::extraction::index::{SearchHit, VectorIndex};
use crate::llm_client::LanguageModel;

/// Separator between retrieved chunks.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Retrieves the `k` chunks most similar to `query` and joins them in retrieval order.
///
/// Chunks are not de-duplicated: repeated text appears once per returned chunk.
pub async fn build_context(
    index: &VectorIndex,
    llm: &dyn LanguageModel,
    query: &str,
    k: usize,
) -> Result<String, PipelineError> {
    let query_vector = llm.embed(query).await?;
    let hits = index.search(&query_vector, k)?;
    debug!(
        "Retrieved chunks {:?} of {} for query {:?}",
        hits.iter().map(|hit| hit.chunk.index).collect::<Vec<_>>(),
        index.len(),
        query
    );
    Ok(join_hits(&hits))
}

pub fn join_hits(hits: &[SearchHit<'_>]) -> String {
    hits.iter()
        .map(|hit| hit.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}
