use crate::cli::CliContext;
use crate::core::history as history_log;
use anyhow::Result;
use chrono::{DateTime, Local};
use clap::Args;
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Table};

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Maximum number of entries to display
    #[arg(long, default_value_t = 50)]
    pub limit: usize,
}

pub fn run(ctx: &CliContext, args: HistoryArgs) -> Result<()> {
    let entries = history_log::read(&ctx.paths, Some(args.limit))?;

    if entries.is_empty() {
        println!("No history entries found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Timestamp").add_attribute(Attribute::Bold),
        Cell::new("Action").add_attribute(Attribute::Bold),
        Cell::new("Tool").add_attribute(Attribute::Bold),
        Cell::new("Version").add_attribute(Attribute::Bold),
        Cell::new("Actor").add_attribute(Attribute::Bold),
        Cell::new("Result").add_attribute(Attribute::Bold),
    ]);

    for entry in &entries {
        let local: DateTime<Local> = entry.timestamp.into();
        let result = if entry.result.success {
            "OK".to_string()
        } else {
            format!(
                "FAIL ({}): {}",
                entry.result.error_kind.as_deref().unwrap_or("?"),
                entry.result.error.as_deref().unwrap_or("?")
            )
        };
        table.add_row(vec![
            local.format("%Y-%m-%d %H:%M:%S").to_string(),
            entry.action.clone(),
            entry.name.clone(),
            entry.version.clone().unwrap_or_else(|| "-".to_string()),
            entry.actor.clone(),
            result,
        ]);
    }

    println!("{}", table);
    println!("\n{} entries shown.", entries.len());
    Ok(())
}
