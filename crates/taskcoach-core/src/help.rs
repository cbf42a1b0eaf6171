//! Help content generation.
//!
//! Also the recovery path after a failed quiz, so the fallback must be safe
//! to show to a user as-is.

use serde_json::json;
use tracing::instrument;

use crate::generation::Generator;
use crate::model::{HelpContent, NormalizedTask};

const STAGE: &str = "help";

const REQUIRED_KEYS: &[&str] = &["summary", "steps", "resources"];

/// Produces summary, steps and resources for a normalized task.
pub struct HelpProducer {
    generator: Generator,
}

impl HelpProducer {
    pub fn new(generator: Generator) -> Self {
        Self { generator }
    }

    #[instrument(skip_all, fields(title = %task.normalized_title))]
    pub async fn produce(&self, task: &NormalizedTask) -> HelpContent {
        match self
            .generator
            .generate_record::<HelpContent>(STAGE, build_prompt(task), schema(), REQUIRED_KEYS)
            .await
        {
            Ok(help) => help,
            Err(e) => {
                tracing::warn!(error = %e, "help generation failed, using fallback");
                fallback()
            }
        }
    }
}

/// Placeholder shown when help could not be generated.
pub fn fallback() -> HelpContent {
    HelpContent {
        summary: "Failed to generate help.".to_string(),
        steps: vec!["Try again later.".to_string()],
        resources: Vec::new(),
    }
}

fn build_prompt(task: &NormalizedTask) -> String {
    format!(
        "Help the user make progress on the task below. Give a short summary, three to five \
         concrete steps, and a few external resources with working URLs.\n\n\
         Return JSON: {{\"summary\": string, \"steps\": [string], \
         \"resources\": [{{\"title\": string, \"url\": string}}]}}\n\n\
         Task:\nTitle: {}\nDescription: {}\n",
        task.normalized_title, task.normalized_description
    )
}

fn schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "summary": {"type": "string"},
            "steps": {"type": "array", "items": {"type": "string"}},
            "resources": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "title": {"type": "string"},
                        "url": {"type": "string"}
                    },
                    "required": ["title", "url"]
                }
            }
        },
        "required": REQUIRED_KEYS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::GenerationSettings;
    use crate::model::NextAgent;
    use crate::test_support::ScriptedProvider;
    use std::sync::Arc;

    fn task() -> NormalizedTask {
        NormalizedTask {
            normalized_title: "Write a cover letter".into(),
            normalized_description: "For a backend role".into(),
            category: "Job Application".into(),
            keywords: vec![],
            complexity: 3,
            next_agent: NextAgent::HelpAgent,
        }
    }

    fn producer(provider: ScriptedProvider) -> HelpProducer {
        HelpProducer::new(Generator::new(
            Arc::new(provider),
            GenerationSettings::default(),
        ))
    }

    #[tokio::test]
    async fn generated_help_is_returned() {
        let raw = "```json\n{\"summary\": \"Tailor it\", \"steps\": [\"Read the posting\"], \
                   \"resources\": [{\"title\": \"Guide\", \"url\": \"https://example.com\"}]}\n```";
        let help = producer(ScriptedProvider::fixed(raw)).produce(&task()).await;
        assert_eq!(help.summary, "Tailor it");
        assert_eq!(help.resources[0].url, "https://example.com");
    }

    #[tokio::test]
    async fn missing_resources_falls_back() {
        let raw = r#"{"summary": "x", "steps": []}"#;
        let help = producer(ScriptedProvider::fixed(raw)).produce(&task()).await;
        assert_eq!(help, fallback());
    }

    #[tokio::test]
    async fn transport_error_falls_back() {
        let help = producer(ScriptedProvider::failing("connection reset"))
            .produce(&task())
            .await;
        assert_eq!(help.summary, "Failed to generate help.");
        assert_eq!(help.steps, vec!["Try again later."]);
        assert!(help.resources.is_empty());
    }
}
