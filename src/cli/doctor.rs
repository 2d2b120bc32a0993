//! Read-only diagnostics for the prefix and host prerequisites.

use crate::cli::CliContext;
use crate::constants;
use crate::core::backend::EnvBackend;
use crate::core::link;
use crate::core::pip::PipBackend;
use crate::core::verify;
use crate::models::formula::{Formula, Requirement};
use anyhow::Result;
use clap::Args;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Also check the interpreter requirement and smoke test of this formula
    #[arg(long)]
    pub formula: Option<PathBuf>,
}

#[derive(Default)]
struct Tally {
    ok: u32,
    warn: u32,
    fail: u32,
}

impl Tally {
    fn pass(&mut self, msg: impl AsRef<str>) {
        println!("  [PASS] {}", msg.as_ref());
        self.ok += 1;
    }

    fn warn(&mut self, msg: impl AsRef<str>) {
        println!("  [WARN] {}", msg.as_ref());
        self.warn += 1;
    }

    fn fail(&mut self, msg: impl AsRef<str>) {
        println!("  [FAIL] {}", msg.as_ref());
        self.fail += 1;
    }
}

pub fn run(ctx: &CliContext, args: DoctorArgs) -> Result<()> {
    let paths = &ctx.paths;
    let mut t = Tally::default();

    println!("Doctor: {}", paths);
    if let Some(w) = &ctx.settings_load_warning {
        t.warn(w);
    }

    if paths.root.is_dir() {
        match tempfile::NamedTempFile::new_in(&paths.root) {
            Ok(_) => t.pass(format!("prefix writable: {}", paths.root.display())),
            Err(e) => t.fail(format!("prefix not writable: {} ({})", paths.root.display(), e)),
        }
    } else {
        t.warn(format!(
            "prefix missing: {} (run: venvtap init)",
            paths.root.display()
        ));
    }

    let formula = match &args.formula {
        Some(path) => match Formula::load(path) {
            Ok(f) => Some(f),
            Err(e) => {
                t.fail(format!("{:#}", e));
                None
            }
        },
        None => None,
    };
    let requirement = match &formula {
        Some(f) => f.requirement()?,
        None => Requirement::AnyPython3,
    };
    match PipBackend::resolve(requirement) {
        Ok(backend) => t.pass(format!("{} satisfied by {}", requirement, backend.describe())),
        Err(e) => t.fail(e.to_string()),
    }

    match which::which("git") {
        Ok(git) => t.pass(format!("git available: {}", git.display())),
        Err(_) => t.warn("git not found on PATH (needed for --head installs)"),
    }

    if bin_on_path(&paths.bin) {
        t.pass(format!("{} is on PATH", paths.bin.display()));
    } else {
        t.warn(format!("{} is not on PATH", paths.bin.display()));
    }

    match link::dangling_links(&paths.bin) {
        Ok(dangling) if dangling.is_empty() => t.pass("no dangling links"),
        Ok(dangling) => {
            for d in dangling {
                t.warn(format!("dangling link: {}", d.display()));
            }
        }
        Err(e) => t.warn(e.to_string()),
    }

    for parked in parked_kegs(&paths.cellar) {
        t.warn(format!(
            "interrupted install left {} (the next install restores it)",
            parked.display()
        ));
    }

    if let Some(f) = &formula {
        let exe = paths.bin.join(&f.name);
        if !exe.exists() {
            t.warn(format!("{} is not installed", f.name));
        } else {
            match verify::smoke_test(&exe, &f.test) {
                Ok(_) => t.pass(format!("smoke test: `{} {}`", f.name, f.test.args.join(" "))),
                Err(e) => t.fail(e.to_string()),
            }
        }
    }

    println!();
    println!(
        "Doctor summary: {} pass, {} warn, {} fail",
        t.ok, t.warn, t.fail
    );
    if t.fail > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn bin_on_path(bin: &Path) -> bool {
    let path = env::var_os("PATH").unwrap_or_default();
    env::split_paths(&path).any(|dir| dir == bin)
}

fn parked_kegs(cellar: &Path) -> Vec<PathBuf> {
    let pattern = cellar
        .join("*")
        .join(format!("*.{}", constants::PREVIOUS_SUFFIX));
    match glob::glob(&pattern.to_string_lossy()) {
        Ok(entries) => entries.filter_map(|e| e.ok()).collect(),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parked_kegs_found() {
        let dir = TempDir::new().unwrap();
        let cellar = dir.path().join("cellar");
        fs::create_dir_all(cellar.join("aws-jumpcloud/2.1.3")).unwrap();
        fs::create_dir_all(cellar.join("aws-jumpcloud/2.1.3.previous")).unwrap();

        let parked = parked_kegs(&cellar);
        assert_eq!(parked, vec![cellar.join("aws-jumpcloud/2.1.3.previous")]);
    }

    #[test]
    fn test_parked_kegs_missing_cellar() {
        let dir = TempDir::new().unwrap();
        assert!(parked_kegs(&dir.path().join("nope")).is_empty());
    }
}
