use crate::cli::CliContext;
use crate::core::metadata;
use crate::models::formula::Formula;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Formula file
    pub formula: PathBuf,
}

pub fn run(ctx: &CliContext, args: InfoArgs) -> Result<()> {
    let formula = Formula::load(&args.formula)?;

    println!("{}: {}", formula.name, formula.version);
    if let Some(desc) = &formula.desc {
        println!("{}", desc);
    }
    if let Some(homepage) = &formula.homepage {
        println!("{}", homepage);
    }
    println!("url:      {}", formula.url);
    println!("sha256:   {}", formula.sha256);
    if let Some(head) = &formula.head {
        println!("head:     {} ({})", head.url, head.branch);
    }
    println!("requires: {}", formula.requirement()?);
    println!(
        "test:     {} {} (expects '{}')",
        formula.name,
        formula.test.args.join(" "),
        formula.test.expect
    );

    let installed = metadata::list_receipts(&ctx.paths, Some(&formula.name))?;
    if installed.is_empty() {
        println!("Not installed");
    } else {
        for r in &installed {
            println!(
                "installed: {} {} from {} ({})",
                r.name,
                r.version,
                r.source,
                r.environment.display()
            );
        }
    }

    if let Some(caveats) = &formula.caveats {
        println!("==> Caveats");
        println!("{}", caveats.trim_end());
    }
    Ok(())
}
