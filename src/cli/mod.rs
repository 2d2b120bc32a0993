//! CLI routing and command dispatch.

use crate::core::history::{self as history_log, HistoryEntry};
use crate::core::metadata;
use crate::core::paths::PrefixPaths;
use crate::models::settings::SettingsFile;
use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

pub mod doctor;
pub mod history;
pub mod info;
pub mod init;
pub mod install;
pub mod list;
pub mod render;
pub mod uninstall;

/// Shared context passed to all command handlers.
pub struct CliContext {
    pub paths: PrefixPaths,
    pub non_interactive: bool,
    pub settings: SettingsFile,
    pub settings_load_warning: Option<String>,
}

impl CliContext {
    /// Append a history entry; failure is reported, never fatal.
    pub fn record(&self, entry: &HistoryEntry) {
        if let Err(e) = history_log::append(&self.paths, entry) {
            eprintln!("warning: history log failed: {:#}", e);
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "venvtap",
    version,
    about = "Install Python CLI tools from checksummed formulas into isolated virtualenvs"
)]
pub struct Cli {
    /// Install prefix (default: $VENVTAP_PREFIX or ~/.venvtap)
    #[arg(long, global = true, value_name = "PATH")]
    pub prefix: Option<PathBuf>,

    /// Run in non-interactive mode (no prompts, suitable for automation)
    #[arg(long, global = true, env = "VENVTAP_NON_INTERACTIVE")]
    pub non_interactive: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let paths = PrefixPaths::resolve(self.prefix);

        // Settings are best-effort; a broken file must not block `doctor`.
        let mut settings_load_warning: Option<String> = None;
        let settings = match metadata::load_settings(&paths.settings) {
            Ok(s) => s,
            Err(e) => {
                settings_load_warning = Some(format!("cannot read settings: {:#}", e));
                SettingsFile::default()
            }
        };
        if let Some(w) = &settings_load_warning {
            tracing::warn!("{}", w);
        }

        let ctx = CliContext {
            paths,
            non_interactive: self.non_interactive,
            settings,
            settings_load_warning,
        };

        match self.command {
            Commands::Init(args) => init::run(&ctx, args),
            Commands::Install(args) => install::run(&ctx, args),
            Commands::Fetch(args) => install::run_fetch(&ctx, args),
            Commands::Test(args) => test::run(&ctx, args),
            Commands::Uninstall(args) => uninstall::run(&ctx, args),
            Commands::List(args) => list::run(&ctx, args),
            Commands::Info(args) => info::run(&ctx, args),
            Commands::Doctor(args) => doctor::run(&ctx, args),
            Commands::Render(args) => render::run(&ctx, args),
            Commands::History(args) => history::run(&ctx, args),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the prefix layout and a default settings file
    Init(init::InitArgs),
    /// Fetch, build, link, and smoke-test a formula
    Install(install::InstallArgs),
    /// Download and verify a formula's artifact without installing
    Fetch(install::FetchArgs),
    /// Run a formula's smoke test against the installed executable
    Test(test::TestArgs),
    /// Remove an installed tool and its links
    Uninstall(uninstall::UninstallArgs),
    /// List installed tools
    List(list::ListArgs),
    /// Show a formula and its install status
    Info(info::InfoArgs),
    /// Diagnose the prefix and host prerequisites (read-only)
    Doctor(doctor::DoctorArgs),
    /// Fill a formula template for a release
    Render(render::RenderArgs),
    /// Show install/uninstall history
    History(history::HistoryArgs),
}
