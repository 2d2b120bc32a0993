//! Shared test doubles and fixtures.

use crate::core::backend::{normalize_name, EnvBackend, InstallMode, Removal};
use crate::core::checksum;
use crate::core::error::InstallError;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

pub const HELP_WITH_ROTATE: &str =
    "usage: aws-jumpcloud <command>\n  list     List profiles\n  rotate   Rotate access keys";

/// Write an executable shell script.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    #[cfg(unix)]
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Build a `.tar.gz` from `(path, content)` pairs.
pub fn write_tarball(dir: &Path, file_name: &str, files: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(file_name);
    let file = fs::File::create(&path).unwrap();
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, content.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
    path
}

/// A release-style tarball wrapping a `setup.py` in `<top>/`.
/// Returns its path and SHA-256.
pub fn source_tarball(dir: &Path, top: &str) -> (PathBuf, String) {
    let setup = format!("{}/setup.py", top);
    let pkg = format!("{}/aws_jumpcloud/__init__.py", top);
    let path = write_tarball(
        dir,
        &format!("{}.tar.gz", top),
        &[
            (setup.as_str(), "from setuptools import setup\nsetup(name='aws_jumpcloud')\n"),
            (pkg.as_str(), ""),
        ],
    );
    let sha = checksum::sha256_file(&path).unwrap();
    (path, sha)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FakeDist {
    pub name: String,
    pub identity: String,
}

/// Environment backend that keeps a JSON registry in the environment and
/// writes a shell script per installed entry point.
///
/// Like pip with `--ignore-installed`, installing a different identity
/// of an already-registered name adds a second registration.
pub struct FakeBackend {
    pub dist_name: String,
    pub script: String,
    pub identity: String,
    pub help: String,
    /// Further entry points installed next to `script`.
    pub extra_scripts: Vec<String>,
    /// Fail the Nth `install` call (1-based).
    pub fail_install_call: Option<usize>,
    /// `uninstall` reports `Removed` but leaves the registry alone.
    pub stuck_uninstall: bool,
    /// The no-deps install registers the name twice.
    pub duplicate_on_reinstall: bool,
    pub calls: RefCell<Vec<String>>,
    installs: RefCell<usize>,
}

impl FakeBackend {
    pub fn new(identity: &str) -> Self {
        Self {
            dist_name: "aws_jumpcloud".into(),
            script: "aws-jumpcloud".into(),
            identity: identity.into(),
            help: HELP_WITH_ROTATE.into(),
            extra_scripts: Vec::new(),
            fail_install_call: None,
            stuck_uninstall: false,
            duplicate_on_reinstall: false,
            calls: RefCell::new(Vec::new()),
            installs: RefCell::new(0),
        }
    }

    fn registry_path(env: &Path) -> PathBuf {
        env.join("registry.json")
    }

    pub fn read_registry(env: &Path) -> Vec<FakeDist> {
        let raw = fs::read_to_string(Self::registry_path(env)).unwrap_or_else(|_| "[]".into());
        serde_json::from_str(&raw).unwrap()
    }

    fn write_registry(env: &Path, dists: &[FakeDist]) {
        fs::write(Self::registry_path(env), serde_json::to_string(dists).unwrap()).unwrap();
    }

    /// Register `identity` as if installed by hand earlier.
    pub fn seed(&self, env: &Path, identity: &str) {
        fs::create_dir_all(env.join("bin")).unwrap();
        let mut dists = Self::read_registry(env);
        dists.push(FakeDist {
            name: self.dist_name.clone(),
            identity: identity.into(),
        });
        Self::write_registry(env, &dists);
        write_script(&env.join("bin"), &self.script, &format!("echo '{}'", self.help));
    }

    fn scripts(&self) -> impl Iterator<Item = &String> {
        std::iter::once(&self.script).chain(self.extra_scripts.iter())
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.borrow_mut().push(call.into());
    }
}

impl EnvBackend for FakeBackend {
    fn create(&self, env: &Path) -> Result<(), InstallError> {
        self.record("create");
        let bin = env.join("bin");
        write_script(&bin, "python", "exit 0");
        write_script(&bin, "pip", "exit 0");
        Self::write_registry(env, &[]);
        Ok(())
    }

    fn install(&self, env: &Path, source: &Path, mode: InstallMode) -> Result<(), InstallError> {
        *self.installs.borrow_mut() += 1;
        let call = *self.installs.borrow();
        self.record(if mode.with_deps { "install+deps" } else { "install" });
        if self.fail_install_call == Some(call) {
            return Err(InstallError::Build {
                step: "pip install".into(),
                code: Some(1),
            });
        }
        if !Self::registry_path(env).exists() || !source.join("setup.py").is_file() {
            return Err(InstallError::Build {
                step: "pip install".into(),
                code: Some(2),
            });
        }

        let mut dists = Self::read_registry(env);
        let wanted = normalize_name(&self.dist_name);
        if !mode.ignore_installed && dists.iter().any(|d| normalize_name(&d.name) == wanted) {
            return Ok(());
        }
        let dist = FakeDist {
            name: self.dist_name.clone(),
            identity: self.identity.clone(),
        };
        if !dists.contains(&dist) {
            dists.push(dist);
        }
        if self.duplicate_on_reinstall && !mode.with_deps {
            dists.push(FakeDist {
                name: self.dist_name.clone(),
                identity: format!("{}+copy", self.identity),
            });
        }
        if mode.with_deps && !dists.iter().any(|d| d.name == "requests") {
            dists.push(FakeDist {
                name: "requests".into(),
                identity: "2.31.0".into(),
            });
        }
        Self::write_registry(env, &dists);
        for script in self.scripts() {
            write_script(&env.join("bin"), script, &format!("echo '{}'", self.help));
        }
        Ok(())
    }

    fn uninstall(&self, env: &Path, name: &str) -> Result<Removal, InstallError> {
        if self.stuck_uninstall {
            self.record("uninstall:Removed");
            return Ok(Removal::Removed);
        }
        let mut dists = Self::read_registry(env);
        let wanted = normalize_name(name);
        let removal = match dists.iter().position(|d| normalize_name(&d.name) == wanted) {
            Some(i) => {
                dists.remove(i);
                if !dists.iter().any(|d| normalize_name(&d.name) == wanted) {
                    for script in self.scripts() {
                        let _ = fs::remove_file(env.join("bin").join(script));
                    }
                }
                Self::write_registry(env, &dists);
                Removal::Removed
            }
            None => Removal::Absent,
        };
        self.record(format!("uninstall:{:?}", removal));
        Ok(removal)
    }

    fn registered(&self, env: &Path, name: &str) -> Result<usize, InstallError> {
        self.record("registered");
        let wanted = normalize_name(name);
        Ok(Self::read_registry(env)
            .iter()
            .filter(|d| normalize_name(&d.name) == wanted)
            .count())
    }

    fn describe(&self) -> String {
        "fake".into()
    }
}
