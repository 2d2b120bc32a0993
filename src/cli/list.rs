use crate::cli::CliContext;
use crate::core::metadata;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::{Args, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    Table,
    Json,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = ListFormat::Table)]
    pub format: ListFormat,
}

pub fn run(ctx: &CliContext, args: ListArgs) -> Result<()> {
    let receipts = metadata::list_receipts(&ctx.paths, None)?;

    if args.format == ListFormat::Json {
        let json = serde_json::to_string_pretty(&receipts).context("serialize list")?;
        println!("{}", json);
        return Ok(());
    }

    if receipts.is_empty() {
        println!("Nothing installed under {}", ctx.paths.root.display());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Name").add_attribute(Attribute::Bold),
        Cell::new("Version").add_attribute(Attribute::Bold),
        Cell::new("Source").add_attribute(Attribute::Bold),
        Cell::new("Executables").add_attribute(Attribute::Bold),
        Cell::new("Installed").add_attribute(Attribute::Bold),
    ]);

    for r in receipts {
        let local: DateTime<Local> = r.installed_at.into();
        let linked = if r.entry_points.is_empty() {
            "-".to_string()
        } else {
            r.entry_points.join(",")
        };
        table.add_row(vec![
            r.name,
            r.version,
            r.source.to_string(),
            linked,
            local.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }

    println!("{}", table);
    Ok(())
}
