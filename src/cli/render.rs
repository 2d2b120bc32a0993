use crate::cli::CliContext;
use crate::constants;
use crate::core::checksum;
use crate::core::template::{self, ReleaseValues};
use crate::models::formula::Formula;
use crate::util::fs as prefix_fs;
use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Formula template (`*.toml.in`)
    pub template: PathBuf,

    /// Release version
    #[arg(long, value_name = "VERSION")]
    pub release: String,

    /// Release tarball URL
    #[arg(long)]
    pub url: String,

    /// Local copy of the release tarball to hash
    #[arg(long, conflicts_with = "sha256", required_unless_present = "sha256")]
    pub artifact: Option<PathBuf>,

    /// Known SHA-256 of the release tarball
    #[arg(long)]
    pub sha256: Option<String>,

    /// Write the formula here instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(_ctx: &CliContext, args: RenderArgs) -> Result<()> {
    let raw = fs::read_to_string(&args.template)
        .with_context(|| format!("read template {}", args.template.display()))?;

    let sha256 = match (&args.artifact, &args.sha256) {
        (Some(path), _) => checksum::sha256_file(path)?,
        (None, Some(sum)) => sum.trim().to_ascii_lowercase(),
        (None, None) => anyhow::bail!("either --artifact or --sha256 is required"),
    };

    let values = ReleaseValues {
        version: args.release,
        tarball_url: args.url,
        sha256,
    };
    let rendered = template::render(&raw, &values)?;
    let formula = Formula::parse(&rendered).context("rendered formula is invalid")?;

    match &args.output {
        Some(out) => {
            prefix_fs::write_atomic(out, rendered.as_bytes(), constants::METADATA_FILE_MODE)
                .with_context(|| format!("write formula {}", out.display()))?;
            println!(
                "rendered {} {} -> {}",
                formula.name,
                formula.version,
                out.display()
            );
        }
        None => print!("{}", rendered),
    }
    Ok(())
}
