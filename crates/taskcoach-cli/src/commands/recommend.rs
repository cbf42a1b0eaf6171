//! The `taskcoach recommend` command.

use anyhow::Result;

use taskcoach_core::recommend::Recommender;

use super::Context;
use crate::CommonArgs;

pub async fn execute(common: CommonArgs) -> Result<()> {
    let ctx = Context::open(common).await?;
    let memory = ctx.tracker.snapshot().await;
    let recommender = Recommender::new(ctx.generator()?);

    let recommendations = recommender.recommend(&memory.skills).await;
    println!("{}", serde_json::to_string_pretty(&recommendations)?);

    if recommendations.is_empty() {
        eprintln!("No recommendations available right now.");
    }
    Ok(())
}
