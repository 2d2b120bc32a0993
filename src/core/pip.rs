//! `venv` + `pip` implementation of [`EnvBackend`].

use crate::constants;
use crate::core::backend::{normalize_name, EnvBackend, InstallMode, Removal};
use crate::core::error::InstallError;
use crate::models::formula::Requirement;
use crate::models::settings::BuildPolicy;
use crate::util::process;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Drives `python -m venv` and the environment's own `pip`.
#[derive(Debug, Clone)]
pub struct PipBackend {
    python: PathBuf,
    version: (u32, u32),
}

#[derive(Debug, Deserialize)]
struct PipListEntry {
    name: String,
}

impl PipBackend {
    /// Locate an interpreter satisfying `req`. Runs before any environment
    /// exists so a missing prerequisite aborts early.
    pub fn resolve(req: Requirement) -> Result<Self, InstallError> {
        let mut rejected = Vec::new();
        for candidate in candidates(req) {
            let python = match which::which(&candidate) {
                Ok(p) => p,
                Err(_) => {
                    rejected.push(format!("{}: not found", candidate));
                    continue;
                }
            };
            match query_version(&python) {
                Ok((major, minor)) if req.accepts(major, minor) => {
                    tracing::info!(python = %python.display(), "using {}.{}", major, minor);
                    return Ok(Self {
                        python,
                        version: (major, minor),
                    });
                }
                Ok((major, minor)) => {
                    rejected.push(format!("{} is {}.{}", python.display(), major, minor))
                }
                Err(detail) => rejected.push(format!("{}: {}", python.display(), detail)),
            }
        }
        Err(InstallError::Dependency {
            requirement: req.to_string(),
            detail: rejected.join("; "),
        })
    }

    pub fn python(&self) -> &Path {
        &self.python
    }

    pub fn version(&self) -> (u32, u32) {
        self.version
    }

    fn env_python(&self, env: &Path) -> PathBuf {
        self.bin_dir(env).join("python")
    }

    fn pip(&self, env: &Path) -> Command {
        let mut cmd = Command::new(self.env_python(env));
        cmd.args(["-m", "pip", "--disable-pip-version-check"]);
        cmd
    }
}

fn candidates(req: Requirement) -> Vec<String> {
    if let Ok(python) = env::var(constants::PYTHON_ENV) {
        if !python.is_empty() {
            return vec![python];
        }
    }
    match req {
        Requirement::Python { major, minor } => {
            vec![format!("python{}.{}", major, minor), "python3".to_string()]
        }
        Requirement::AnyPython3 => vec!["python3".to_string(), "python".to_string()],
    }
}

fn query_version(python: &Path) -> Result<(u32, u32), String> {
    let mut cmd = Command::new(python);
    cmd.args(["-c", "import sys; print('%d.%d' % sys.version_info[:2])"]);
    let out = process::capture(&mut cmd).map_err(|e| e.to_string())?;
    if !out.success() {
        return Err(out.combined().trim().to_string());
    }
    parse_version(&out.stdout).ok_or_else(|| format!("unexpected version output '{}'", out.stdout.trim()))
}

/// Parse `MAJOR.MINOR` (anything after a second dot is ignored).
pub fn parse_version(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}

/// Interpret `pip uninstall` output. `None` means a real failure.
pub fn classify_uninstall(success: bool, output: &str) -> Option<Removal> {
    let lower = output.to_ascii_lowercase();
    if lower.contains("not installed") {
        return Some(Removal::Absent);
    }
    if success {
        return Some(Removal::Removed);
    }
    None
}

pub fn count_registered(pip_list_json: &str, name: &str) -> Result<usize, serde_json::Error> {
    let entries: Vec<PipListEntry> = serde_json::from_str(pip_list_json)?;
    let wanted = normalize_name(name);
    Ok(entries
        .iter()
        .filter(|e| normalize_name(&e.name) == wanted)
        .count())
}

fn install_args(mode: InstallMode) -> Vec<&'static str> {
    let mut args = vec!["install", "-v"];
    if !mode.with_deps {
        args.push("--no-deps");
    }
    if mode.ignore_installed {
        args.push("--ignore-installed");
    }
    if mode.policy == BuildPolicy::FromSource {
        args.extend(["--no-binary", ":all:"]);
    }
    args
}

fn build_step(step: &str, cmd: &mut Command) -> Result<(), InstallError> {
    let status = process::stream(cmd)
        .map_err(|e| InstallError::io(format!("run {}", process::describe(cmd)), e))?;
    if status.success() {
        return Ok(());
    }
    Err(InstallError::Build {
        step: step.to_string(),
        code: status.code(),
    })
}

impl EnvBackend for PipBackend {
    fn create(&self, env: &Path) -> Result<(), InstallError> {
        let mut cmd = Command::new(&self.python);
        cmd.args(["-m", "venv"]).arg(env);
        build_step("create environment", &mut cmd)
    }

    fn install(&self, env: &Path, source: &Path, mode: InstallMode) -> Result<(), InstallError> {
        let mut cmd = self.pip(env);
        cmd.args(install_args(mode)).arg(source);
        build_step("pip install", &mut cmd)
    }

    fn uninstall(&self, env: &Path, name: &str) -> Result<Removal, InstallError> {
        let mut cmd = self.pip(env);
        cmd.args(["uninstall", "-y", name]);
        let out = process::capture(&mut cmd)
            .map_err(|e| InstallError::io(format!("run {}", process::describe(&cmd)), e))?;
        let combined = out.combined();
        match classify_uninstall(out.success(), &combined) {
            Some(removal) => {
                tracing::info!(?removal, "{}", combined.trim());
                Ok(removal)
            }
            None => {
                eprint!("{}", combined);
                Err(InstallError::Build {
                    step: "pip uninstall".to_string(),
                    code: out.code(),
                })
            }
        }
    }

    fn registered(&self, env: &Path, name: &str) -> Result<usize, InstallError> {
        let mut cmd = self.pip(env);
        cmd.args(["list", "--format=json"]);
        let out = process::capture(&mut cmd)
            .map_err(|e| InstallError::io(format!("run {}", process::describe(&cmd)), e))?;
        if !out.success() {
            eprint!("{}", out.combined());
            return Err(InstallError::Build {
                step: "pip list".to_string(),
                code: out.code(),
            });
        }
        count_registered(&out.stdout, name).map_err(|e| {
            InstallError::io(
                "parse pip list output",
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })
    }

    fn describe(&self) -> String {
        format!(
            "python {}.{} ({})",
            self.version.0,
            self.version.1,
            self.python.display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("3.8\n"), Some((3, 8)));
        assert_eq!(parse_version("3.11.4"), Some((3, 11)));
        assert_eq!(parse_version("garbage"), None);
    }

    #[test]
    fn test_classify_uninstall() {
        assert_eq!(
            classify_uninstall(true, "WARNING: Skipping aws-jumpcloud as it is not installed.\n"),
            Some(Removal::Absent)
        );
        assert_eq!(
            classify_uninstall(true, "Successfully uninstalled aws-jumpcloud-2.1.3\n"),
            Some(Removal::Removed)
        );
        assert_eq!(
            classify_uninstall(false, "ERROR: Cannot uninstall 'x'. Permission denied\n"),
            None
        );
    }

    #[test]
    fn test_count_registered_normalizes_names() {
        let json = r#"[{"name":"aws_jumpcloud","version":"2.1.3"},
                       {"name":"AWS-JumpCloud","version":"2.1.2"},
                       {"name":"boto3","version":"1.20.0"}]"#;
        assert_eq!(count_registered(json, "aws-jumpcloud").unwrap(), 2);
        assert_eq!(count_registered(json, "keyring").unwrap(), 0);
        assert!(count_registered("not json", "x").is_err());
    }

    #[test]
    fn test_install_args_follow_mode() {
        let strict = InstallMode {
            with_deps: true,
            ignore_installed: true,
            policy: BuildPolicy::FromSource,
        };
        assert_eq!(
            install_args(strict),
            vec!["install", "-v", "--ignore-installed", "--no-binary", ":all:"]
        );
        let loose = InstallMode {
            with_deps: false,
            ignore_installed: false,
            policy: BuildPolicy::AllowBinary,
        };
        assert_eq!(install_args(loose), vec!["install", "-v", "--no-deps"]);
    }

    #[test]
    fn test_resolve_reports_dependency_error() {
        // A pin no host will satisfy.
        if env::var(constants::PYTHON_ENV).is_ok() {
            return;
        }
        let err = PipBackend::resolve(Requirement::Python {
            major: 3,
            minor: 999,
        })
        .unwrap_err();
        assert_eq!(err.kind(), "dependency");
        assert!(err.to_string().contains("python@3.999"));
    }
}
