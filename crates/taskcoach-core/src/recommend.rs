//! Next-task recommendations from current mastery.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::generation::Generator;
use crate::model::Recommendation;

const STAGE: &str = "recommend";

const REQUIRED_KEYS: &[&str] = &["recommendations"];

/// Number of recommendations requested.
pub const RECOMMENDATION_COUNT: usize = 3;

#[derive(Deserialize)]
struct Recommendations {
    recommendations: Vec<Recommendation>,
}

/// Suggests what to work on next.
pub struct Recommender {
    generator: Generator,
}

impl Recommender {
    pub fn new(generator: Generator) -> Self {
        Self { generator }
    }

    /// Empty when nothing usable comes back.
    #[instrument(skip_all, fields(topics = skills.len()))]
    pub async fn recommend(&self, skills: &BTreeMap<String, f64>) -> Vec<Recommendation> {
        let generated = self
            .generator
            .generate_record::<Recommendations>(STAGE, build_prompt(skills), schema(), REQUIRED_KEYS)
            .await;

        match generated {
            Ok(mut parsed) => {
                parsed.recommendations.truncate(RECOMMENDATION_COUNT);
                parsed.recommendations
            }
            Err(e) => {
                tracing::warn!(error = %e, "recommendation failed, returning none");
                Vec::new()
            }
        }
    }
}

fn build_prompt(skills: &BTreeMap<String, f64>) -> String {
    let mastery = serde_json::to_string_pretty(skills).unwrap_or_else(|_| "{}".to_string());
    format!(
        "Recommend {RECOMMENDATION_COUNT} tasks the user should work on next, based on these \
         mastery scores between 0 and 1 (higher means better mastered):\n{mastery}\n\n\
         Return JSON: {{\"recommendations\": [{{\"title\": string, \"reason\": string}}]}}\n"
    )
}

fn schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "recommendations": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "title": {"type": "string"},
                        "reason": {"type": "string"}
                    },
                    "required": ["title", "reason"]
                }
            }
        },
        "required": REQUIRED_KEYS,
    })
}
