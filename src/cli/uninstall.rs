use crate::cli::CliContext;
use crate::core::file_lock;
use crate::core::history::HistoryEntry;
use crate::core::link;
use crate::core::metadata;
use crate::models::formula::parse_tool_name;
use crate::util::fs as prefix_fs;
use anyhow::{bail, Context, Result};
use clap::Args;
use dialoguer::Confirm;

#[derive(Args, Debug)]
pub struct UninstallArgs {
    /// Tool name
    #[arg(value_parser = parse_tool_name)]
    pub name: String,

    /// Do not ask for confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,
}

pub fn run(ctx: &CliContext, args: UninstallArgs) -> Result<()> {
    let paths = &ctx.paths;
    let rack = paths.rack(&args.name);
    if !rack.is_dir() {
        bail!("'{}' is not installed under {}", args.name, paths.root.display());
    }

    if ctx.non_interactive && !args.yes {
        bail!("--non-interactive requires --yes for uninstall");
    }
    if !args.yes {
        let versions: Vec<String> = metadata::list_receipts(paths, Some(&args.name))?
            .into_iter()
            .map(|r| r.version)
            .collect();
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Remove {} ({})?",
                args.name,
                if versions.is_empty() {
                    "no receipts".to_string()
                } else {
                    versions.join(", ")
                }
            ))
            .default(false)
            .interact()
            .context("read confirmation")?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    let _lock = file_lock::lock_tool(paths, &args.name, false)?;
    let history = HistoryEntry::new("uninstall", &args.name);

    let result = link::unlink_into(&paths.bin, &rack, &[])
        .map_err(anyhow::Error::from)
        .and_then(|unlinked| {
            prefix_fs::remove_dir_if_exists(&rack)?;
            Ok(unlinked)
        });

    match result {
        Ok(unlinked) => {
            ctx.record(&history);
            for l in &unlinked {
                println!("unlinked {}", l.display());
            }
            println!("uninstalled {}", args.name);
            Ok(())
        }
        Err(e) => {
            ctx.record(&history.failed("io", format!("{:#}", e)));
            Err(e)
        }
    }
}
