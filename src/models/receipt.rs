//! Install receipt written into each keg.

use crate::models::settings::BuildPolicy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallReceipt {
    pub name: String,
    pub version: String,
    pub source: ReceiptSource,
    pub installed_at: DateTime<Utc>,
    pub build_policy: BuildPolicy,
    /// Interpreter/tooling that built the environment.
    #[serde(default)]
    pub backend: String,
    pub environment: PathBuf,
    #[serde(default)]
    pub entry_points: Vec<String>,
}

/// Where the installed bits came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ReceiptSource {
    Tarball { url: String, sha256: String },
    Head { url: String, branch: String },
    Path { path: PathBuf },
}

impl fmt::Display for ReceiptSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tarball { url, .. } => write!(f, "{}", url),
            Self::Head { url, branch } => write!(f, "{}#{}", url, branch),
            Self::Path { path } => write!(f, "{}", path.display()),
        }
    }
}
