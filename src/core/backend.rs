//! Seam between the install procedure and the package tooling that
//! populates an environment.

use crate::core::error::InstallError;
use crate::models::settings::BuildPolicy;
use std::path::Path;

/// Flags for one install pass into an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallMode {
    pub with_deps: bool,
    /// Install over whatever is registered instead of failing or skipping.
    pub ignore_installed: bool,
    pub policy: BuildPolicy,
}

/// Outcome of one removal attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    /// Nothing was registered under the name. Not an error.
    Absent,
}

pub trait EnvBackend {
    /// Materialize an empty environment at `env`.
    fn create(&self, env: &Path) -> Result<(), InstallError>;

    /// Build `source` and install it into `env`.
    fn install(&self, env: &Path, source: &Path, mode: InstallMode) -> Result<(), InstallError>;

    /// Remove one registration of `name` from `env`.
    fn uninstall(&self, env: &Path, name: &str) -> Result<Removal, InstallError>;

    /// Number of packages registered in `env` under `name`.
    fn registered(&self, env: &Path, name: &str) -> Result<usize, InstallError>;

    /// Directory holding the environment's executables.
    fn bin_dir(&self, env: &Path) -> std::path::PathBuf {
        env.join("bin")
    }

    /// Short description for receipts and logs.
    fn describe(&self) -> String;
}

/// Normalize a distribution name: lower-case, runs of `-`, `_`, `.`
/// collapse into a single `-`.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_sep = false;
    for c in name.chars() {
        if c == '-' || c == '_' || c == '.' {
            if !in_sep {
                out.push('-');
            }
            in_sep = true;
        } else {
            out.push(c.to_ascii_lowercase());
            in_sep = false;
        }
    }
    out
}
