//! The `taskcoach mastery` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use taskcoach_core::model::MemoryStore;

use super::Context;
use crate::CommonArgs;

pub async fn execute(history: usize, common: CommonArgs) -> Result<()> {
    let ctx = Context::open(common).await?;
    if let Some(reason) = ctx.tracker.load_error() {
        anyhow::bail!("mastery store could not be loaded: {reason}");
    }
    let memory = ctx.tracker.snapshot().await;

    if memory.skills.is_empty() {
        println!("No quiz attempts recorded yet. Pass a quiz with `taskcoach submit` first.");
        return Ok(());
    }

    println!("{}", skills_table(&memory));

    if history > 0 && !memory.history.is_empty() {
        println!("\nRecent attempts:");
        for record in memory.history.iter().rev().take(history) {
            println!(
                "  {}  {:<30} {:>5.1}%  {}",
                record.timestamp.format("%Y-%m-%d %H:%M"),
                record.title,
                record.score * 100.0,
                if record.passed { "passed" } else { "failed" },
            );
        }
    }

    Ok(())
}

fn skills_table(memory: &MemoryStore) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Topic", "Mastery", "Attempts", "Last score"]);

    for (topic, mastery) in &memory.skills {
        let attempts: Vec<_> = memory.history.iter().filter(|r| &r.title == topic).collect();
        let last = attempts
            .last()
            .map(|r| format!("{:.1}%", r.score * 100.0))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(topic),
            Cell::new(format!("{mastery:.2}")),
            Cell::new(attempts.len()),
            Cell::new(last),
        ]);
    }

    table
}
