//! The `taskcoach verify-names` command.

use std::path::PathBuf;

use anyhow::Result;
use clap::ValueEnum;
use serde_json::json;

use taskcoach_core::verify::NameVerifier;

use super::{read_session, Context};
use crate::CommonArgs;

/// Verdict to report when the names could not be checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnFailure {
    /// Treat the names as verified.
    Trust,
    /// Treat the names as not verified.
    Reject,
    /// Exit with an error.
    Error,
}

pub async fn execute(
    session: PathBuf,
    names: String,
    on_failure: OnFailure,
    common: CommonArgs,
) -> Result<()> {
    let outcome = read_session(&session)?;
    let names: Vec<String> = names.split(',').map(|n| n.trim().to_string()).collect();

    let ctx = Context::open(common).await?;
    let verifier = NameVerifier::new(ctx.deferred_generator());

    let (verified, checked) = match verifier.verify_names(&names, outcome.normalized()).await {
        Ok(verified) => (verified, true),
        Err(e) => match on_failure {
            OnFailure::Error => anyhow::bail!("could not verify names: {e}"),
            OnFailure::Trust | OnFailure::Reject => {
                let verified = on_failure == OnFailure::Trust;
                eprintln!("Warning: could not verify names ({e}); reporting verified={verified}");
                (verified, false)
            }
        },
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({ "verified": verified, "checked": checked }))?
    );
    Ok(())
}
