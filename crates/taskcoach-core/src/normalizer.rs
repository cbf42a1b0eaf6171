//! Task normalization and routing.
//!
//! Turns a [`RawTask`] into a [`NormalizedTask`] with one generation call.
//! This is the pipeline's entry point, so it never fails: any problem with
//! the generated output yields [`fallback`].

use serde_json::json;
use tracing::instrument;

use crate::error::GenerationError;
use crate::generation::Generator;
use crate::model::{NextAgent, NormalizedTask, RawTask};

const STAGE: &str = "normalize";

const REQUIRED_KEYS: &[&str] = &[
    "normalizedTitle",
    "normalizedDescription",
    "category",
    "keywords",
    "complexity",
    "nextAgent",
];

/// Category used when neither the model nor the caller supplies one.
pub const DEFAULT_CATEGORY: &str = "General";

/// Complexity assumed when the model gives none.
pub const DEFAULT_COMPLEXITY: u8 = 5;

/// Normalizes raw tasks and picks the next stage.
pub struct TaskNormalizer {
    generator: Generator,
}

impl TaskNormalizer {
    pub fn new(generator: Generator) -> Self {
        Self { generator }
    }

    #[instrument(skip_all, fields(title = %raw.title))]
    pub async fn normalize(&self, raw: &RawTask) -> NormalizedTask {
        let generated = self
            .generator
            .generate_record::<NormalizedTask>(STAGE, build_prompt(raw), schema(), REQUIRED_KEYS)
            .await
            .and_then(tidy);

        match generated {
            Ok(task) => task,
            Err(e) => {
                tracing::warn!(error = %e, "normalization failed, using fallback");
                fallback(raw)
            }
        }
    }
}

/// Deterministic normalization that copies the caller's fields.
pub fn fallback(raw: &RawTask) -> NormalizedTask {
    let category = if raw.category.trim().is_empty() {
        DEFAULT_CATEGORY.to_string()
    } else {
        raw.category.clone()
    };

    NormalizedTask {
        normalized_title: raw.title.clone(),
        normalized_description: raw.description.clone(),
        category,
        keywords: Vec::new(),
        complexity: DEFAULT_COMPLEXITY,
        next_agent: NextAgent::QuizAgent,
    }
}

fn tidy(mut task: NormalizedTask) -> Result<NormalizedTask, GenerationError> {
    let title = task.normalized_title.trim();
    if title.is_empty() {
        return Err(GenerationError::Rejected("normalizedTitle is blank".into()));
    }
    task.normalized_title = title.to_string();
    if task.category.trim().is_empty() {
        task.category = DEFAULT_CATEGORY.to_string();
    }
    task.complexity = task.complexity.clamp(1, 10);
    Ok(task)
}

fn build_prompt(raw: &RawTask) -> String {
    let mut prompt = String::from(
        "Normalize the task below for a learning assistant.\n\
         - Rewrite the title and description in a short, canonical form.\n\
         - Pick a category, extract keywords, and estimate complexity from 1 to 10.\n\
         - Choose the next step: \"QuizAgent\" when the user can be tested on concrete \
         knowledge, \"HelpAgent\" when they need guidance first, \"NetworkingAgent\" for \
         outreach tasks.\n\n\
         Return JSON with the keys normalizedTitle, normalizedDescription, category, \
         keywords, complexity, nextAgent.\n\n",
    );

    prompt.push_str(&format!(
        "Task:\nTitle: {}\nDescription: {}\nCategory: {}\n",
        raw.title, raw.description, raw.category
    ));
    if let Some(url) = &raw.context_url {
        prompt.push_str(&format!("Resource the user is working from: {url}\n"));
    }
    if let Some(profile) = &raw.user_profile {
        prompt.push_str(&format!("User profile: {profile}\n"));
    }
    prompt
}

fn schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "normalizedTitle": {"type": "string"},
            "normalizedDescription": {"type": "string"},
            "category": {"type": "string"},
            "keywords": {"type": "array", "items": {"type": "string"}},
            "complexity": {"type": "integer"},
            "nextAgent": {
                "type": "string",
                "enum": ["QuizAgent", "HelpAgent", "NetworkingAgent"]
            }
        },
        "required": REQUIRED_KEYS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::GenerationSettings;
    use crate::test_support::ScriptedProvider;
    use std::sync::Arc;

    fn raw(title: &str, category: &str) -> RawTask {
        RawTask {
            title: title.into(),
            description: "Practice for-loops in Python".into(),
            category: category.into(),
            context_url: None,
            user_profile: None,
        }
    }

    fn normalizer(provider: ScriptedProvider) -> TaskNormalizer {
        TaskNormalizer::new(Generator::new(
            Arc::new(provider),
            GenerationSettings::default(),
        ))
    }

    #[tokio::test]
    async fn uses_generated_task() {
        let provider = ScriptedProvider::fixed(
            r#"{"normalizedTitle": " Python Loops ", "normalizedDescription": "Iterate",
                "category": "CS", "keywords": ["for", "range"], "complexity": 14,
                "nextAgent": "HelpAgent"}"#,
        );
        let task = normalizer(provider).normalize(&raw("loops", "CS")).await;
        assert_eq!(task.normalized_title, "Python Loops");
        assert_eq!(task.keywords, vec!["for", "range"]);
        assert_eq!(task.complexity, 10);
        assert_eq!(task.next_agent, NextAgent::HelpAgent);
    }

    #[tokio::test]
    async fn unparseable_output_falls_back() {
        let task = normalizer(ScriptedProvider::fixed("no json here"))
            .normalize(&raw("Loops", "CS"))
            .await;
        assert_eq!(task, fallback(&raw("Loops", "CS")));
        assert_eq!(task.normalized_title, "Loops");
        assert_eq!(task.category, "CS");
        assert_eq!(task.complexity, 5);
        assert_eq!(task.next_agent, NextAgent::QuizAgent);
        assert!(task.keywords.is_empty());
    }

    #[tokio::test]
    async fn missing_key_falls_back() {
        let provider =
            ScriptedProvider::fixed(r#"{"normalizedTitle": "Loops", "nextAgent": "HelpAgent"}"#);
        let task = normalizer(provider).normalize(&raw("Loops", "")).await;
        assert_eq!(task.next_agent, NextAgent::QuizAgent);
        assert_eq!(task.category, DEFAULT_CATEGORY);
    }

    #[tokio::test]
    async fn blank_title_falls_back() {
        let provider = ScriptedProvider::fixed(
            r#"{"normalizedTitle": "  ", "normalizedDescription": "", "category": "CS",
                "keywords": [], "complexity": 3, "nextAgent": "HelpAgent"}"#,
        );
        let task = normalizer(provider).normalize(&raw("Loops", "CS")).await;
        assert_eq!(task.normalized_title, "Loops");
        assert_eq!(task.next_agent, NextAgent::QuizAgent);
    }

    #[tokio::test]
    async fn provider_failure_falls_back() {
        let task = normalizer(ScriptedProvider::failing("network down"))
            .normalize(&raw("Loops", "CS"))
            .await;
        assert_eq!(task.normalized_title, "Loops");
    }

    #[tokio::test]
    async fn prompt_carries_context_and_schema() {
        let provider = Arc::new(ScriptedProvider::fixed("{}"));
        let normalizer = TaskNormalizer::new(Generator::new(
            provider.clone(),
            GenerationSettings::default(),
        ));
        let mut task = raw("Loops", "CS");
        task.context_url = Some("https://docs.python.org/3/tutorial".into());
        normalizer.normalize(&task).await;

        let request = provider.last_request().unwrap();
        assert!(request.prompt.contains("Title: Loops"));
        assert!(request.prompt.contains("https://docs.python.org/3/tutorial"));
        assert_eq!(request.schema_hint.unwrap()["required"][5], "nextAgent");
    }
}
