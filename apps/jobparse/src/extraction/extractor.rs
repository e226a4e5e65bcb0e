use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::PipelineError;
use crate::extraction::prompts::{
    COMPANY_NAME_QUESTION, LOCATION_QUESTION, RECRUITER_EMAIL_QUESTION, ROLE_QUESTION,
};
use crate::llm_client::prompts::{fill_template, preprocess_template};
use crate::llm_client::LanguageModel;

pub const MISSING_SUMMARY: &str = "job description not found; run fetch first";

/// The four fields pulled out of every posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub company_name: String,
    pub role: String,
    pub location: String,
    pub recruiter_email: String,
}

impl ExtractionRecord {
    pub fn fields(&self) -> [(&'static str, &str); 4] {
        [
            ("company_name", self.company_name.as_str()),
            ("role", self.role.as_str()),
            ("location", self.location.as_str()),
            ("recruiter_email", self.recruiter_email.as_str()),
        ]
    }

    /// Field name → value, for template population by document layers.
    #[allow(dead_code)]
    pub fn into_map(self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("company_name".to_string(), self.company_name),
            ("role".to_string(), self.role),
            ("location".to_string(), self.location),
            ("recruiter_email".to_string(), self.recruiter_email),
        ])
    }
}

/// Answers targeted questions against a cached job description summary.
/// No retrieval: the summary itself is the whole context.
pub struct ExtractionEngine<'a> {
    llm: &'a dyn LanguageModel,
    template: &'a str,
    summary: Option<&'a str>,
}

impl<'a> ExtractionEngine<'a> {
    pub fn new(llm: &'a dyn LanguageModel, template: &'a str, summary: Option<&'a str>) -> Self {
        Self {
            llm,
            template,
            summary,
        }
    }

    /// One independent model call; the answer is whitespace-trimmed.
    pub async fn extract(&self, question: &str) -> Result<String, PipelineError> {
        let summary = self
            .summary
            .ok_or_else(|| PipelineError::Precondition(MISSING_SUMMARY.to_string()))?;

        let prompt = fill_template(
            &preprocess_template(self.template),
            &[("job_description", summary), ("question", question)],
        );
        let answer = self.llm.complete(&prompt).await?;
        debug!("Extracted {:?} for {:?}", answer.trim(), question);

        Ok(answer.trim().to_string())
    }

    pub async fn extract_company_name(&self) -> Result<String, PipelineError> {
        self.extract(COMPANY_NAME_QUESTION).await
    }

    pub async fn extract_role(&self) -> Result<String, PipelineError> {
        self.extract(ROLE_QUESTION).await
    }

    pub async fn extract_location(&self) -> Result<String, PipelineError> {
        self.extract(LOCATION_QUESTION).await
    }

    pub async fn extract_recruiter_email(&self) -> Result<String, PipelineError> {
        self.extract(RECRUITER_EMAIL_QUESTION).await
    }

    /// Runs the four extractions one after another. The first failure aborts.
    pub async fn extract_all(&self) -> Result<ExtractionRecord, PipelineError> {
        let record = ExtractionRecord {
            company_name: self.extract_company_name().await?,
            role: self.extract_role().await?,
            location: self.extract_location().await?,
            recruiter_email: self.extract_recruiter_email().await?,
        };
        for (field, value) in record.fields() {
            info!("Extracted {field}: {value:?}");
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::llm_client::LlmError;
    use crate::test_support::{ScriptedModel, ACME_SUMMARY};

    #[tokio::test]
    async fn test_acme_scenario() {
        let model = ScriptedModel::acme();
        let config = PipelineConfig::default();
        let engine = ExtractionEngine::new(&model, &config.extraction_template, Some(ACME_SUMMARY));

        assert_eq!(engine.extract_company_name().await.unwrap(), "Acme Corp");
        assert_eq!(engine.extract_location().await.unwrap(), "Remote");
        assert_eq!(engine.extract_recruiter_email().await.unwrap(), "jobs@acme.com");
    }

    #[tokio::test]
    async fn test_extract_without_summary_is_precondition_error() {
        let model = ScriptedModel::acme();
        let config = PipelineConfig::default();
        let engine = ExtractionEngine::new(&model, &config.extraction_template, None);

        let result = engine.extract_role().await;

        assert!(
            matches!(result, Err(PipelineError::Precondition(msg)) if msg.contains("job description not found"))
        );
        assert_eq!(model.completion_calls(), 0);
    }

    #[tokio::test]
    async fn test_prompt_carries_summary_and_question() {
        let model = ScriptedModel::acme();
        let engine = ExtractionEngine::new(
            &model,
            "JD={job_description} Q={question}",
            Some("short summary"),
        );

        engine.extract("Is it remote?").await.unwrap();

        assert_eq!(model.prompts(), vec!["JD=short summary Q=Is it remote?"]);
    }

    #[tokio::test]
    async fn test_extract_all_has_four_trimmed_fields() {
        let model = ScriptedModel::acme();
        let config = PipelineConfig::default();
        let engine = ExtractionEngine::new(&model, &config.extraction_template, Some(ACME_SUMMARY));

        let record = engine.extract_all().await.unwrap();

        let keys: Vec<&str> = record.fields().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["company_name", "role", "location", "recruiter_email"]);
        for (_, value) in record.fields() {
            assert_eq!(value, value.trim());
        }
        assert_eq!(record.role, "Senior Backend Engineer");
        assert_eq!(model.completion_calls(), 4);
    }

    #[tokio::test]
    async fn test_extract_all_runs_in_fixed_order() {
        let model = ScriptedModel::acme();
        let config = PipelineConfig::default();
        let engine = ExtractionEngine::new(&model, &config.extraction_template, Some(ACME_SUMMARY));

        engine.extract_all().await.unwrap();

        let prompts = model.prompts();
        assert!(prompts[0].contains(COMPANY_NAME_QUESTION));
        assert!(prompts[1].contains(ROLE_QUESTION));
        assert!(prompts[2].contains(LOCATION_QUESTION));
        assert!(prompts[3].contains(RECRUITER_EMAIL_QUESTION));
    }

    #[tokio::test]
    async fn test_failed_question_can_be_retried() {
        let model = ScriptedModel::acme().fail_on("location mentioned", 1);
        let config = PipelineConfig::default();
        let engine = ExtractionEngine::new(&model, &config.extraction_template, Some(ACME_SUMMARY));

        let first = engine.extract_location().await;
        assert!(matches!(
            first,
            Err(PipelineError::ModelInvocation(LlmError::Api { status: 429, .. }))
        ));
        assert_eq!(engine.extract_location().await.unwrap(), "Remote");
    }

    #[test]
    fn test_record_serializes_with_fixed_keys() {
        let record = ExtractionRecord {
            company_name: "Acme Corp".to_string(),
            role: "Senior Backend Engineer".to_string(),
            location: "Remote".to_string(),
            recruiter_email: "jobs@acme.com".to_string(),
        };

        let value = serde_json::to_value(&record).unwrap();
        let mut keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        keys.sort();
        assert_eq!(keys, vec!["company_name", "location", "recruiter_email", "role"]);

        let map = record.into_map();
        assert_eq!(map.len(), 4);
        assert_eq!(map["location"], "Remote");
    }
}
