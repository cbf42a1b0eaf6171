//! The `taskcoach submit` command.

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use taskcoach_core::grader::parse_answers;
use taskcoach_core::{Orchestrator, ProcessOutcome};

use super::{read_session, Context};
use crate::CommonArgs;

pub async fn execute(session: PathBuf, answers: String, common: CommonArgs) -> Result<()> {
    let ProcessOutcome::Quiz { normalized, quiz } = read_session(&session)? else {
        anyhow::bail!(
            "session {} has no quiz (stage: help); nothing to submit",
            session.display()
        );
    };

    let answers = parse_answers(&answers).map_err(anyhow::Error::msg)?;
    if answers.len() != quiz.questions.len() {
        eprintln!(
            "Warning: {} answer(s) for {} question(s); missing answers count as wrong.",
            answers.len(),
            quiz.questions.len()
        );
    }

    // A pass never reaches the model, so provider setup is not required.
    let ctx = Context::open(common).await?;
    let orchestrator = Orchestrator::new(ctx.deferred_generator(), ctx.tracker.clone());

    let result = orchestrator
        .submit_quiz(&normalized, &quiz, &answers)
        .await
        .context("failed to record mastery")?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
