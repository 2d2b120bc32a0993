//! Prefix-wide settings (`venvtap.toml`).

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub policy: PolicySection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySection {
    /// Build policy applied to every install under this prefix.
    #[serde(default)]
    pub build: BuildPolicy,

    /// Run the formula's smoke test after each install.
    #[serde(default = "default_true")]
    pub verify_after_install: bool,

    /// Permit installs as root.
    #[serde(default)]
    pub allow_root: bool,
}

impl Default for PolicySection {
    fn default() -> Self {
        Self {
            build: BuildPolicy::default(),
            verify_after_install: true,
            allow_root: false,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Whether pre-built wheels may be used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BuildPolicy {
    /// Compile every distribution from source (`--no-binary :all:`).
    #[default]
    FromSource,
    /// Accept pre-built wheels.
    AllowBinary,
}

impl fmt::Display for BuildPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FromSource => write!(f, "from-source"),
            Self::AllowBinary => write!(f, "allow-binary"),
        }
    }
}
