//! The install procedure.
//!
//! Steps, all under the tool's lock:
//! 1. stage the source (integrity is checked here, before anything else)
//! 2. create the environment and build the source into it
//! 3. remove every registration under the tool's name
//! 4. install again and link the entry points that appear
//!
//! Until the final commit, a failure discards the new keg and restores
//! the one it replaced, so existing links keep resolving.

use crate::constants;
use crate::core::backend::{EnvBackend, InstallMode, Removal};
use crate::core::error::{InstallError, IoContext};
use crate::core::fetch::{self, BuildTree, Source};
use crate::core::file_lock;
use crate::core::link::{self, LinkedExecutable};
use crate::core::metadata;
use crate::core::paths::PrefixPaths;
use crate::models::receipt::InstallReceipt;
use crate::models::settings::BuildPolicy;
use crate::util::fs as prefix_fs;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    /// Reuse an existing environment for this version instead of
    /// rebuilding it from scratch. Failures are not rolled back.
    pub reuse_env: bool,
    /// Block on a held install lock instead of failing with `Busy`.
    pub wait: bool,
    pub policy: BuildPolicy,
}

#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub name: String,
    pub version: String,
    pub source: Source,
}

#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub keg: PathBuf,
    pub env: PathBuf,
    /// The entry point named like the tool, else the first one.
    pub primary: LinkedExecutable,
    pub links: Vec<LinkedExecutable>,
    /// Registrations under the tool's name found before the build.
    pub prior: usize,
    /// Registrations removed during conflict resolution.
    pub removed: usize,
    pub pruned: Vec<PathBuf>,
    pub receipt: InstallReceipt,
}

pub struct Installer<'a, B: EnvBackend> {
    paths: &'a PrefixPaths,
    backend: &'a B,
    options: InstallOptions,
}

impl<'a, B: EnvBackend> Installer<'a, B> {
    pub fn new(paths: &'a PrefixPaths, backend: &'a B, options: InstallOptions) -> Self {
        Self {
            paths,
            backend,
            options,
        }
    }

    pub fn install(&self, req: &InstallRequest) -> Result<InstallOutcome, InstallError> {
        let _lock = file_lock::lock_tool(self.paths, &req.name, self.options.wait)?;
        tracing::info!(name = %req.name, version = %req.version, "install started");

        let tree = fetch::prepare(self.paths, &req.source)?;

        let mut keg = KegSwap::begin(self.paths, &req.name, &req.version, self.options.reuse_env)?;
        let env = self.paths.env_dir(&req.name, &req.version);
        let built = self.build(req, &tree, &env, keg.reusing())?;

        let links = self.link(&env, &built.entry_points)?;
        keg.commit();

        let pruned = self.prune(&req.name, &req.version, &links);
        let primary = links
            .iter()
            .find(|l| l.name == req.name)
            .or_else(|| links.first())
            .cloned()
            .ok_or_else(|| InstallError::Link {
                path: self.paths.bin.clone(),
                detail: "no executables linked".to_string(),
            })?;

        tracing::info!(name = %req.name, link = %primary.link.display(), "install finished");
        Ok(InstallOutcome {
            keg: self.paths.keg(&req.name, &req.version),
            env,
            primary,
            links,
            prior: built.prior,
            removed: built.removed,
            pruned,
            receipt: built.receipt,
        })
    }

    fn build(
        &self,
        req: &InstallRequest,
        tree: &BuildTree,
        env: &Path,
        reusing: bool,
    ) -> Result<Built, InstallError> {
        if reusing {
            tracing::info!(env = %env.display(), "reusing environment");
        } else {
            tracing::info!(env = %env.display(), "creating environment");
            self.backend.create(env)?;
        }
        let prior = self.backend.registered(env, &req.name)?;

        let mode = InstallMode {
            with_deps: true,
            ignore_installed: true,
            policy: self.options.policy,
        };
        tracing::info!(source = %tree.dir.display(), policy = %mode.policy, "building");
        self.backend.install(env, &tree.dir, mode)?;

        let removed = self.remove_registrations(env, &req.name)?;

        // Conflict removal also took the console scripts with it, so
        // whatever shows up in bin/ now belongs to this package.
        let env_bin = self.backend.bin_dir(env);
        let before = link::snapshot(&env_bin)?;
        self.backend.install(
            env,
            &tree.dir,
            InstallMode {
                with_deps: false,
                ..mode
            },
        )?;
        let after = link::snapshot(&env_bin)?;
        let mut entry_points = link::new_entries(&before, &after);
        if entry_points.is_empty() && prefix_fs::is_executable_file(&env_bin.join(&req.name)) {
            entry_points.push(req.name.clone());
        }
        if entry_points.is_empty() {
            return Err(InstallError::Link {
                path: env_bin,
                detail: format!("'{}' installed no executables", req.name),
            });
        }

        let count = self.backend.registered(env, &req.name)?;
        if count != 1 {
            return Err(InstallError::Conflict {
                name: req.name.clone(),
                count,
                env: env.to_path_buf(),
            });
        }

        let receipt = InstallReceipt {
            name: req.name.clone(),
            version: req.version.clone(),
            source: tree.source.clone(),
            installed_at: Utc::now(),
            build_policy: self.options.policy,
            backend: self.backend.describe(),
            environment: env.to_path_buf(),
            entry_points: entry_points.clone(),
        };
        metadata::save_receipt(&self.paths.receipt(&req.name, &req.version), &receipt)?;

        Ok(Built {
            entry_points,
            prior,
            removed,
            receipt,
        })
    }

    /// Uninstall until nothing is registered under `name`. Absence on the
    /// first pass is the common case and is not an error.
    fn remove_registrations(&self, env: &Path, name: &str) -> Result<usize, InstallError> {
        let mut removed = 0;
        loop {
            match self.backend.uninstall(env, name)? {
                Removal::Absent => break,
                Removal::Removed => {
                    removed += 1;
                    if removed >= constants::MAX_REMOVAL_PASSES {
                        return Err(InstallError::Conflict {
                            name: name.to_string(),
                            count: self.backend.registered(env, name)?,
                            env: env.to_path_buf(),
                        });
                    }
                }
            }
        }
        if removed == 0 {
            tracing::info!(name, "no prior registration to remove");
        } else {
            tracing::info!(name, removed, "removed prior registrations");
        }
        Ok(removed)
    }

    /// Link every entry point; on failure put back the links already swapped.
    fn link(&self, env: &Path, entry_points: &[String]) -> Result<Vec<LinkedExecutable>, InstallError> {
        let env_bin = self.backend.bin_dir(env);
        let mut swapped: Vec<(PathBuf, Option<PathBuf>)> = Vec::new();
        let mut linked = Vec::new();

        for name in entry_points {
            let link_path = self.paths.bin.join(name);
            let previous = fs::read_link(&link_path).ok();
            match link::link_all(&self.paths.bin, &env_bin, std::slice::from_ref(name)) {
                Ok(mut l) => {
                    swapped.push((link_path, previous));
                    linked.append(&mut l);
                }
                Err(e) => {
                    restore_links(&swapped);
                    return Err(e);
                }
            }
        }
        Ok(linked)
    }

    /// Remove other versions of the tool and links that no longer belong
    /// to it. Failures here do not undo a finished install.
    fn prune(&self, name: &str, version: &str, keep: &[LinkedExecutable]) -> Vec<PathBuf> {
        let keep_links: Vec<PathBuf> = keep.iter().map(|l| l.link.clone()).collect();
        let rack = self.paths.rack(name);
        if let Err(e) = link::unlink_into(&self.paths.bin, &rack, &keep_links) {
            tracing::warn!("prune stale links: {}", e);
        }

        let mut pruned = Vec::new();
        let current = self.paths.keg(name, version);
        let entries = match fs::read_dir(&rack) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("read {}: {}", rack.display(), e);
                return pruned;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            // `current` itself, or a directory holding it.
            if current.starts_with(&path) || !path.is_dir() {
                continue;
            }
            match prefix_fs::remove_dir_if_exists(&path) {
                Ok(_) => {
                    tracing::info!(keg = %path.display(), "pruned old version");
                    pruned.push(path);
                }
                Err(e) => tracing::warn!("{:#}", e),
            }
        }
        pruned.sort();
        pruned
    }
}

struct Built {
    entry_points: Vec<String>,
    prior: usize,
    removed: usize,
    receipt: InstallReceipt,
}

fn restore_links(swapped: &[(PathBuf, Option<PathBuf>)]) {
    for (link_path, previous) in swapped.iter().rev() {
        let result = match previous {
            Some(target) => link::link_atomic(link_path, target),
            None => fs::remove_file(link_path).io_context(|| format!("remove {}", link_path.display())),
        };
        if let Err(e) = result {
            tracing::error!("restore {}: {}", link_path.display(), e);
        }
    }
}

/// Moves an existing keg aside while its replacement is built, and puts it
/// back on drop unless committed.
struct KegSwap {
    keg: PathBuf,
    parked: Option<PathBuf>,
    reusing: bool,
    committed: bool,
}

impl KegSwap {
    fn begin(paths: &PrefixPaths, name: &str, version: &str, reuse_env: bool) -> Result<Self, InstallError> {
        let keg = paths.keg(name, version);
        let parked_path = paths.previous_keg(name, version);

        // A parked keg means an earlier run died mid-install; it is the
        // last known-good copy.
        if parked_path.is_dir() {
            tracing::warn!(keg = %keg.display(), "restoring keg parked by an interrupted install");
            remove_dir(&keg)?;
            fs::rename(&parked_path, &keg)
                .io_context(|| format!("restore {}", parked_path.display()))?;
        }

        if reuse_env && paths.env_dir(name, version).is_dir() {
            return Ok(Self {
                keg,
                parked: None,
                reusing: true,
                committed: false,
            });
        }

        let parked = if keg.exists() {
            fs::rename(&keg, &parked_path)
                .io_context(|| format!("move aside {}", keg.display()))?;
            Some(parked_path)
        } else {
            None
        };
        fs::create_dir_all(&keg).io_context(|| format!("create dir {}", keg.display()))?;
        Ok(Self {
            keg,
            parked,
            reusing: false,
            committed: false,
        })
    }

    fn reusing(&self) -> bool {
        self.reusing
    }

    /// After this the new keg is live. A parked keg that cannot be removed
    /// is left behind for `doctor` to report.
    fn commit(&mut self) {
        self.committed = true;
        if let Some(parked) = self.parked.take() {
            if let Err(e) = remove_dir(&parked) {
                tracing::warn!("keep {}: {}", parked.display(), e);
            }
        }
    }
}

impl Drop for KegSwap {
    fn drop(&mut self) {
        if self.committed || self.reusing {
            return;
        }
        tracing::warn!(keg = %self.keg.display(), "install failed; discarding new environment");
        if let Err(e) = remove_dir(&self.keg) {
            tracing::error!("{}", e);
            return;
        }
        if let Some(parked) = self.parked.take() {
            if let Err(e) = fs::rename(&parked, &self.keg) {
                tracing::error!("restore {}: {}", parked.display(), e);
            }
        }
    }
}

fn remove_dir(path: &Path) -> Result<(), InstallError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(InstallError::io(format!("remove {}", path.display()), e)),
    }
}
