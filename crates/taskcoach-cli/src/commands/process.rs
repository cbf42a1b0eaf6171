//! The `taskcoach process` command.

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use taskcoach_core::model::RawTask;
use taskcoach_core::{Orchestrator, ProcessOutcome};

use super::Context;
use crate::CommonArgs;

pub async fn execute(
    title: String,
    description: String,
    category: String,
    context_url: Option<String>,
    profile: Option<PathBuf>,
    save: Option<PathBuf>,
    common: CommonArgs,
) -> Result<()> {
    anyhow::ensure!(!title.trim().is_empty(), "title must not be empty");

    let user_profile = match &profile {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read profile: {}", path.display()))?;
            Some(
                serde_json::from_str(&content)
                    .with_context(|| format!("failed to parse profile: {}", path.display()))?,
            )
        }
        None => None,
    };

    let ctx = Context::open(common).await?;
    let orchestrator = Orchestrator::new(ctx.generator()?, ctx.tracker.clone());

    let raw = RawTask {
        title,
        description,
        category,
        context_url,
        user_profile,
    };
    let outcome = orchestrator.process(&raw).await;
    let json = serde_json::to_string_pretty(&outcome)?;

    if let Some(path) = &save {
        std::fs::write(path, &json)
            .with_context(|| format!("failed to write session: {}", path.display()))?;
        match &outcome {
            ProcessOutcome::Quiz { quiz, .. } => eprintln!(
                "Session saved to {path}. Answer the {} question(s) with: \
                 taskcoach submit --session {path} --answers ...",
                quiz.questions.len(),
                path = path.display(),
            ),
            ProcessOutcome::Help { .. } => {
                eprintln!("Session saved to {}", path.display())
            }
        }
    }

    println!("{json}");
    Ok(())
}
