//! Plausibility check for the people a user reports contacting on a
//! networking task.
//!
//! Unlike the producing stages this one has no fallback of its own: the
//! failure is returned and the caller picks the default.

use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::error::GenerationError;
use crate::generation::Generator;
use crate::model::NormalizedTask;

const STAGE: &str = "verify";

const REQUIRED_KEYS: &[&str] = &["verified"];

#[derive(Deserialize)]
struct Verification {
    verified: bool,
}

/// Asks the model whether a list of contact names fits a task.
pub struct NameVerifier {
    generator: Generator,
}

impl NameVerifier {
    pub fn new(generator: Generator) -> Self {
        Self { generator }
    }

    /// Whether `names` are plausible contacts for `task`.
    ///
    /// Blank names are ignored; a list with none left is rejected without
    /// calling the model.
    #[instrument(skip_all, fields(title = %task.normalized_title, names = names.len()))]
    pub async fn verify_names(
        &self,
        names: &[String],
        task: &NormalizedTask,
    ) -> Result<bool, GenerationError> {
        let names: Vec<&str> = names
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .collect();
        if names.is_empty() {
            return Err(GenerationError::Rejected("no names to verify".into()));
        }

        let verification = self
            .generator
            .generate_record::<Verification>(
                STAGE,
                build_prompt(&names, task),
                schema(),
                REQUIRED_KEYS,
            )
            .await?;

        tracing::info!(verified = verification.verified, "names checked");
        Ok(verification.verified)
    }
}

fn build_prompt(names: &[&str], task: &NormalizedTask) -> String {
    format!(
        "The user says they contacted these people for the task below: {}.\n\
         Are these plausible names for people related to the task?\n\n\
         Return JSON: {{\"verified\": boolean}}\n\n\
         Task:\nTitle: {}\nDescription: {}\n",
        names.join(", "),
        task.normalized_title,
        task.normalized_description
    )
}

fn schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "verified": {"type": "boolean"}
        },
        "required": REQUIRED_KEYS,
    })
}
