//! Summarization Chain: condenses a posting into the job description summary.
//!
//! Two explicit stages, each a single model call:
//! 1. analyst: retrieved context + question → verbose answer
//! 2. summarize: stage-1 answer (as `{text}`) → condensed summary
//!
//! Either stage failing fails the whole chain; nothing partial is returned.

use tracing::{debug, info};

use crate::errors::PipelineError;
use crate::extraction::index::VectorIndex;
use crate::extraction::prompts::JOB_DESCRIPTION_ANALYST_TEMPLATE;
use crate::extraction::retrieval::build_context;
use crate::llm_client::prompts::{fill_template, preprocess_template};
use crate::llm_client::{LanguageModel, LlmError};

pub struct SummarizationChain<'a> {
    llm: &'a dyn LanguageModel,
    index: &'a VectorIndex,
    summarize_template: &'a str,
    retrieval_k: usize,
}

impl<'a> SummarizationChain<'a> {
    pub fn new(
        llm: &'a dyn LanguageModel,
        index: &'a VectorIndex,
        summarize_template: &'a str,
        retrieval_k: usize,
    ) -> Self {
        Self {
            llm,
            index,
            summarize_template,
            retrieval_k,
        }
    }

    /// Runs both stages for `query` and returns the stage-2 output.
    pub async fn summarize(&self, query: &str) -> Result<String, PipelineError> {
        let analysis = self.analyze(query).await?;
        info!("Analyst stage complete ({} chars)", analysis.len());

        let template = preprocess_template(self.summarize_template);
        let summary_prompt = fill_template(&template, &[("text", &analysis)]);
        let summary = self.llm.complete(&summary_prompt).await?;
        if summary.trim().is_empty() {
            return Err(PipelineError::ModelInvocation(LlmError::EmptyContent));
        }

        info!("Summarize stage complete ({} chars)", summary.len());
        Ok(summary)
    }

    /// Stage 1: answers `query` over the chunks retrieved for it.
    async fn analyze(&self, query: &str) -> Result<String, PipelineError> {
        let context = build_context(self.index, self.llm, query, self.retrieval_k).await?;
        debug!("Analyst context: {} chars", context.len());

        let prompt = fill_template(
            JOB_DESCRIPTION_ANALYST_TEMPLATE,
            &[("question", query), ("context", &context)],
        );
        Ok(self.llm.complete(&prompt).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::extraction::chunker::TextChunker;
    use crate::extraction::prompts::JOB_DESCRIPTION_QUERY;
    use crate::test_support::{ScriptedModel, ACME_POSTING, ACME_SUMMARY};

    async fn acme_index(model: &ScriptedModel) -> VectorIndex {
        let chunks = TextChunker::new(500, 50).unwrap().chunk(ACME_POSTING);
        VectorIndex::build(chunks, model).await.unwrap()
    }

    #[tokio::test]
    async fn test_two_stages_run_in_order() {
        let model = ScriptedModel::acme();
        let index = acme_index(&model).await;
        let config = PipelineConfig::default();
        let chain = SummarizationChain::new(&model, &index, &config.summarize_template, 4);

        let summary = chain.summarize(JOB_DESCRIPTION_QUERY).await.unwrap();

        assert_eq!(summary, ACME_SUMMARY);
        let prompts = model.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("expert job description analyst"));
        assert!(prompts[0].contains("Question: Provide, full job description"));
        assert!(prompts[0].contains("Contact jobs@acme.com"));
        assert!(prompts[1].contains("seasoned HR expert"));
    }

    #[tokio::test]
    async fn test_stage_two_sees_only_stage_one_output() {
        let model = ScriptedModel::new()
            .answer("expert job description analyst", "STAGE-ONE-ANSWER")
            .answer("Condense:", "short");
        let index = acme_index(&model).await;
        let chain = SummarizationChain::new(&model, &index, "Condense: {text}", 4);

        chain.summarize(JOB_DESCRIPTION_QUERY).await.unwrap();

        assert_eq!(model.prompts()[1], "Condense: STAGE-ONE-ANSWER");
    }

    #[tokio::test]
    async fn test_stage_one_failure_skips_stage_two() {
        let model = ScriptedModel::acme().fail_on("expert job description analyst", 1);
        let index = acme_index(&model).await;
        let config = PipelineConfig::default();
        let chain = SummarizationChain::new(&model, &index, &config.summarize_template, 4);

        let result = chain.summarize(JOB_DESCRIPTION_QUERY).await;

        assert!(matches!(
            result,
            Err(PipelineError::ModelInvocation(LlmError::Api { status: 429, .. }))
        ));
        assert_eq!(model.completion_calls(), 1);
    }

    #[tokio::test]
    async fn test_stage_two_failure_is_model_error() {
        let model = ScriptedModel::acme().fail_on("seasoned HR expert", 1);
        let index = acme_index(&model).await;
        let config = PipelineConfig::default();
        let chain = SummarizationChain::new(&model, &index, &config.summarize_template, 4);

        let result = chain.summarize(JOB_DESCRIPTION_QUERY).await;

        assert!(matches!(result, Err(PipelineError::ModelInvocation(_))));
        assert_eq!(model.completion_calls(), 2);
    }

    #[tokio::test]
    async fn test_blank_summary_is_rejected() {
        let model = ScriptedModel::new()
            .answer("expert job description analyst", "analysis")
            .answer("Condense:", "   ");
        let index = acme_index(&model).await;
        let chain = SummarizationChain::new(&model, &index, "Condense: {text}", 4);

        let result = chain.summarize(JOB_DESCRIPTION_QUERY).await;

        assert!(matches!(
            result,
            Err(PipelineError::ModelInvocation(LlmError::EmptyContent))
        ));
    }
}
