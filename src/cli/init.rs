use crate::cli::CliContext;
use crate::constants;
use crate::core::metadata;
use crate::models::settings::BuildPolicy;
use crate::util::fs as prefix_fs;
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Build policy to record in the settings file
    #[arg(long, value_enum)]
    pub build_policy: Option<BuildPolicy>,
}

pub fn run(ctx: &CliContext, args: InitArgs) -> Result<()> {
    let paths = &ctx.paths;
    for dir in [&paths.root, &paths.bin, &paths.cellar, &paths.cache, &paths.locks] {
        prefix_fs::ensure_dir(dir, constants::PREFIX_DIR_MODE)?;
    }

    let missing = !paths.settings.exists();
    let mut settings = metadata::load_settings(&paths.settings)?;
    if let Some(policy) = args.build_policy {
        settings.policy.build = policy;
    }
    if missing || args.build_policy.is_some() {
        metadata::save_settings(&paths.settings, &settings)?;
    }

    println!("prefix initialized at {}", paths.root.display());
    println!("build policy: {}", settings.policy.build);
    println!("add {} to PATH to use installed tools", paths.bin.display());
    Ok(())
}
