//! Linked executables: stable host paths pointing into an environment.

use crate::core::error::{InstallError, IoContext};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedExecutable {
    pub name: String,
    pub link: PathBuf,
    pub target: PathBuf,
}

/// File names currently present in an environment's bin directory.
pub fn snapshot(bin_dir: &Path) -> Result<BTreeSet<String>, InstallError> {
    if !bin_dir.is_dir() {
        return Ok(BTreeSet::new());
    }
    let mut names = BTreeSet::new();
    for entry in fs::read_dir(bin_dir).io_context(|| format!("read {}", bin_dir.display()))? {
        let entry = entry.io_context(|| format!("read {}", bin_dir.display()))?;
        if let Some(name) = entry.file_name().to_str() {
            names.insert(name.to_string());
        }
    }
    Ok(names)
}

/// Entries that appeared between two snapshots, sorted.
pub fn new_entries(before: &BTreeSet<String>, after: &BTreeSet<String>) -> Vec<String> {
    after.difference(before).cloned().collect()
}

/// Point `link` at `target`, replacing whatever was there in one rename.
pub fn link_atomic(link: &Path, target: &Path) -> Result<(), InstallError> {
    let parent = link.parent().ok_or_else(|| InstallError::Link {
        path: link.to_path_buf(),
        detail: "link has no parent directory".to_string(),
    })?;
    fs::create_dir_all(parent).io_context(|| format!("create dir {}", parent.display()))?;
    if fs::symlink_metadata(link).is_ok() && !is_symlink(link) {
        return Err(InstallError::Link {
            path: link.to_path_buf(),
            detail: "refusing to replace a file that is not a link".to_string(),
        });
    }

    let file_name = link
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("link");
    let staging = parent.join(format!(".{}.venvtap-{}", file_name, std::process::id()));
    if is_symlink(&staging) || staging.exists() {
        fs::remove_file(&staging).io_context(|| format!("remove {}", staging.display()))?;
    }
    symlink(target, &staging)?;
    if let Err(e) = fs::rename(&staging, link) {
        let _ = fs::remove_file(&staging);
        return Err(InstallError::Link {
            path: link.to_path_buf(),
            detail: e.to_string(),
        });
    }
    Ok(())
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> Result<(), InstallError> {
    std::os::unix::fs::symlink(target, link).map_err(|e| InstallError::Link {
        path: link.to_path_buf(),
        detail: e.to_string(),
    })
}

#[cfg(not(unix))]
fn symlink(_target: &Path, link: &Path) -> Result<(), InstallError> {
    Err(InstallError::Link {
        path: link.to_path_buf(),
        detail: "symlinks are only supported on unix hosts".to_string(),
    })
}

pub fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// Link each entry point of `env_bin` into `host_bin`.
pub fn link_all(
    host_bin: &Path,
    env_bin: &Path,
    names: &[String],
) -> Result<Vec<LinkedExecutable>, InstallError> {
    let mut linked = Vec::with_capacity(names.len());
    for name in names {
        let link = host_bin.join(name);
        let target = env_bin.join(name);
        link_atomic(&link, &target)?;
        tracing::info!(link = %link.display(), target = %target.display(), "linked");
        linked.push(LinkedExecutable {
            name: name.clone(),
            link,
            target,
        });
    }
    Ok(linked)
}

/// Symlinks in `host_bin` whose target lies under `dir`.
pub fn links_into(host_bin: &Path, dir: &Path) -> Result<Vec<PathBuf>, InstallError> {
    let mut out = Vec::new();
    if !host_bin.is_dir() {
        return Ok(out);
    }
    for entry in fs::read_dir(host_bin).io_context(|| format!("read {}", host_bin.display()))? {
        let path = entry
            .io_context(|| format!("read {}", host_bin.display()))?
            .path();
        if let Ok(target) = fs::read_link(&path) {
            if target.starts_with(dir) {
                out.push(path);
            }
        }
    }
    out.sort();
    Ok(out)
}

/// Remove symlinks in `host_bin` that point under `dir`, except `keep`.
pub fn unlink_into(
    host_bin: &Path,
    dir: &Path,
    keep: &[PathBuf],
) -> Result<Vec<PathBuf>, InstallError> {
    let mut removed = Vec::new();
    for link in links_into(host_bin, dir)? {
        if keep.contains(&link) {
            continue;
        }
        fs::remove_file(&link).io_context(|| format!("remove {}", link.display()))?;
        removed.push(link);
    }
    Ok(removed)
}

/// Symlinks in `host_bin` whose target no longer exists.
pub fn dangling_links(host_bin: &Path) -> Result<Vec<PathBuf>, InstallError> {
    let mut out = Vec::new();
    if !host_bin.is_dir() {
        return Ok(out);
    }
    for entry in fs::read_dir(host_bin).io_context(|| format!("read {}", host_bin.display()))? {
        let path = entry
            .io_context(|| format!("read {}", host_bin.display()))?
            .path();
        if is_symlink(&path) && !path.exists() {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}
