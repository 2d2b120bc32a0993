//! Prefix path resolution and directory layout.
//!
//! ```text
//! <prefix>/bin/<entry>                    -> cellar/<name>/<version>/libexec/bin/<entry>
//! <prefix>/cellar/<name>/<version>/libexec   isolated environment
//! <prefix>/cache/<name>--<version>.tar.gz    verified downloads
//! <prefix>/locks/<name>.lock                 per-tool install lock
//! ```

use crate::constants;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct PrefixPaths {
    pub root: PathBuf,
    pub bin: PathBuf,
    pub cellar: PathBuf,
    pub cache: PathBuf,
    pub locks: PathBuf,
    pub settings: PathBuf,
    pub history: PathBuf,
    pub history_lock: PathBuf,
}

impl PrefixPaths {
    /// Resolve the prefix from CLI arg, env var, or `$HOME`.
    pub fn resolve(root_arg: Option<PathBuf>) -> Self {
        if let Some(root) = root_arg {
            return Self::from_root(root);
        }
        if let Ok(root) = env::var(constants::PREFIX_ENV) {
            if !root.is_empty() {
                return Self::from_root(PathBuf::from(root));
            }
        }
        match env::var_os("HOME") {
            Some(home) if !home.is_empty() => {
                Self::from_root(PathBuf::from(home).join(constants::DEFAULT_PREFIX_DIR))
            }
            _ => Self::from_root(PathBuf::from(constants::FALLBACK_PREFIX)),
        }
    }

    /// Create prefix paths from a root directory.
    pub fn from_root(root: PathBuf) -> Self {
        let bin = root.join("bin");
        let cellar = root.join("cellar");
        let cache = root.join("cache");
        let locks = root.join("locks");
        let settings = root.join(constants::SETTINGS_FILE);
        let history = root.join("history.log");
        let history_lock = root.join("history.lock");
        Self {
            root,
            bin,
            cellar,
            cache,
            locks,
            settings,
            history,
            history_lock,
        }
    }

    /// All versions of one tool.
    pub fn rack(&self, name: &str) -> PathBuf {
        self.cellar.join(name)
    }

    /// One installed version of a tool.
    pub fn keg(&self, name: &str, version: &str) -> PathBuf {
        self.rack(name).join(version)
    }

    /// Where a keg is parked while its replacement is built.
    pub fn previous_keg(&self, name: &str, version: &str) -> PathBuf {
        self.rack(name)
            .join(format!("{}.{}", version, constants::PREVIOUS_SUFFIX))
    }

    pub fn env_dir(&self, name: &str, version: &str) -> PathBuf {
        self.keg(name, version).join(constants::ENV_DIR)
    }

    pub fn receipt(&self, name: &str, version: &str) -> PathBuf {
        self.keg(name, version).join(constants::RECEIPT_FILE)
    }

    pub fn lock_file(&self, name: &str) -> PathBuf {
        self.locks.join(format!("{}.lock", name))
    }

    pub fn cached_artifact(&self, name: &str, version: &str) -> PathBuf {
        self.cache.join(format!("{}--{}.tar.gz", name, version))
    }
}

impl std::fmt::Display for PrefixPaths {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "prefix@{}", self.root.display())
    }
}
