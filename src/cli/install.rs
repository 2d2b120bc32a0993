use crate::cli::CliContext;
use crate::core::backend::EnvBackend;
use crate::core::error::InstallError;
use crate::core::fetch::{self, Source};
use crate::core::history::HistoryEntry;
use crate::core::installer::{InstallOptions, InstallOutcome, InstallRequest, Installer};
use crate::core::pip::PipBackend;
use crate::core::verify;
use crate::models::formula::Formula;
use crate::util::privilege;
use anyhow::{bail, Result};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Formula file
    pub formula: PathBuf,

    /// Install the branch tip of the formula's head repository
    #[arg(long, conflicts_with = "from_path")]
    pub head: bool,

    /// Install from a local working tree (development)
    #[arg(long, value_name = "DIR")]
    pub from_path: Option<PathBuf>,

    /// Reuse this version's existing environment instead of rebuilding it
    #[arg(long)]
    pub reuse_env: bool,

    /// Skip the post-install smoke test
    #[arg(long)]
    pub no_verify: bool,

    /// Wait for a concurrent install of the same tool instead of failing
    #[arg(long)]
    pub wait: bool,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Formula file
    pub formula: PathBuf,
}

/// Pick the source for an install and the version label its keg gets.
pub fn select_source(formula: &Formula, args: &InstallArgs) -> Result<(Source, String)> {
    if let Some(dir) = &args.from_path {
        return Ok((Source::Path(dir.clone()), format!("{}-dev", formula.version)));
    }
    if args.head {
        let head = match &formula.head {
            Some(h) => h.clone(),
            None => bail!("formula '{}' has no head repository", formula.name),
        };
        return Ok((Source::Head(head), "HEAD".to_string()));
    }
    Ok((Source::Tarball(formula.artifact()), formula.version.clone()))
}

pub fn run(ctx: &CliContext, args: InstallArgs) -> Result<()> {
    privilege::refuse_root("install", ctx.settings.policy.allow_root)?;

    let formula = Formula::load(&args.formula)?;
    let (source, version) = select_source(&formula, &args)?;
    let request = InstallRequest {
        name: formula.name.clone(),
        version: version.clone(),
        source,
    };
    let history = HistoryEntry::new("install", &formula.name)
        .version(&version)
        .source(request.source.receipt_source().to_string());

    let options = InstallOptions {
        reuse_env: args.reuse_env,
        wait: args.wait,
        policy: ctx.settings.policy.build,
    };

    let outcome = PipBackend::resolve(formula.requirement()?).and_then(|backend| {
        tracing::info!(backend = %backend.describe(), "resolved interpreter");
        Installer::new(&ctx.paths, &backend, options).install(&request)
    });

    let outcome = match outcome {
        Ok(o) => o,
        Err(e) => {
            ctx.record(&history.failed(e.kind(), e.to_string()));
            return Err(e.into());
        }
    };
    ctx.record(&history);
    print_outcome(&formula, &version, &outcome);

    if let Some(caveats) = &formula.caveats {
        println!("==> Caveats");
        println!("{}", caveats.trim_end());
    }

    if args.no_verify || !ctx.settings.policy.verify_after_install {
        return Ok(());
    }
    smoke(ctx, &formula, &outcome.primary.link)
}

fn print_outcome(formula: &Formula, version: &str, outcome: &InstallOutcome) {
    println!("==> Installed {} {}", formula.name, version);
    println!("    environment: {}", outcome.env.display());
    for link in &outcome.links {
        println!("    linked: {} -> {}", link.link.display(), link.target.display());
    }
    if outcome.prior > 0 {
        println!(
            "    replaced {} existing registration(s) of '{}'",
            outcome.prior, formula.name
        );
    }
    for keg in &outcome.pruned {
        println!("    removed old version: {}", keg.display());
    }
}

/// Smoke-test a linked executable, recording a failure in history.
pub fn smoke(ctx: &CliContext, formula: &Formula, exe: &std::path::Path) -> Result<()> {
    match verify::smoke_test(exe, &formula.test) {
        Ok(_) => {
            println!(
                "==> Smoke test passed: `{} {}` mentions '{}'",
                exe.display(),
                formula.test.args.join(" "),
                formula.test.expect
            );
            Ok(())
        }
        Err(e) => {
            ctx.record(
                &HistoryEntry::new("test", &formula.name).failed(e.kind(), e.to_string()),
            );
            Err(e.into())
        }
    }
}

pub fn run_fetch(ctx: &CliContext, args: FetchArgs) -> Result<()> {
    let formula = Formula::load(&args.formula)?;
    let artifact = formula.artifact();
    let path = fetch::fetch_artifact(&ctx.paths, &artifact).map_err(|e: InstallError| {
        ctx.record(
            &HistoryEntry::new("fetch", &formula.name)
                .version(&formula.version)
                .failed(e.kind(), e.to_string()),
        );
        e
    })?;
    println!("{}", path.display());
    println!("sha256: {} (verified)", artifact.sha256);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formula() -> Formula {
        Formula::parse(
            r#"
name = "aws-jumpcloud"
version = "2.1.3"
url = "https://example.com/a.tar.gz"
sha256 = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"

[head]
url = "https://github.com/CirrusMD/aws-jumpcloud.git"
"#,
        )
        .unwrap()
    }

    fn args() -> InstallArgs {
        InstallArgs {
            formula: PathBuf::from("f.toml"),
            head: false,
            from_path: None,
            reuse_env: false,
            no_verify: false,
            wait: false,
        }
    }

    #[test]
    fn test_select_tarball_by_default() {
        let (source, version) = select_source(&formula(), &args()).unwrap();
        assert!(matches!(source, Source::Tarball(ref a) if a.version == "2.1.3"));
        assert_eq!(version, "2.1.3");
    }

    #[test]
    fn test_select_head() {
        let mut a = args();
        a.head = true;
        let (source, version) = select_source(&formula(), &a).unwrap();
        assert!(matches!(source, Source::Head(ref h) if h.branch == "main"));
        assert_eq!(version, "HEAD");
    }

    #[test]
    fn test_select_head_without_repo_fails() {
        let mut f = formula();
        f.head = None;
        let mut a = args();
        a.head = true;
        assert!(select_source(&f, &a).is_err());
    }

    #[test]
    fn test_select_local_tree() {
        let mut a = args();
        a.from_path = Some(PathBuf::from("/work/aws-jumpcloud"));
        let (source, version) = select_source(&formula(), &a).unwrap();
        assert!(matches!(source, Source::Path(_)));
        assert_eq!(version, "2.1.3-dev");
    }
}
