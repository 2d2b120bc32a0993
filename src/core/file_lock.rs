//! Per-tool install lock using flock(2).
//!
//! The environment directory and the linked executables of a tool are one
//! host-wide resource; every mutation of them happens under this lock.

use crate::core::error::{InstallError, IoContext};
use crate::core::paths::PrefixPaths;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// An exclusive file lock. Released on drop (file close releases flock).
#[derive(Debug)]
pub struct FileLock {
    _file: File,
    path: PathBuf,
}

impl FileLock {
    /// Acquire an exclusive lock, blocking until available.
    pub fn exclusive(path: &Path) -> Result<Self, InstallError> {
        let file = open_lock_file(path)?;
        file.lock_exclusive()
            .io_context(|| format!("acquire lock {}", path.display()))?;
        Ok(Self {
            _file: file,
            path: path.to_path_buf(),
        })
    }

    /// Try to acquire an exclusive lock without blocking.
    /// Returns `Ok(Some(lock))` if acquired, `Ok(None)` if already held.
    pub fn try_exclusive(path: &Path) -> Result<Option<Self>, InstallError> {
        let file = open_lock_file(path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self {
                _file: file,
                path: path.to_path_buf(),
            })),
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            // fs2 on Linux may return Other instead of WouldBlock
            Err(ref e) if e.raw_os_error() == Some(11) => Ok(None), // EAGAIN
            Err(e) => Err(InstallError::io(format!("try lock {}", path.display()), e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_lock_file(path: &Path) -> Result<File, InstallError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).io_context(|| format!("create dir {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)
        .io_context(|| format!("open lock file {}", path.display()))
}

/// Take the install lock for `name`. Without `wait`, a held lock is `Busy`.
pub fn lock_tool(paths: &PrefixPaths, name: &str, wait: bool) -> Result<FileLock, InstallError> {
    let path = paths.lock_file(name);
    if wait {
        tracing::info!(lock = %path.display(), "waiting for install lock");
        return FileLock::exclusive(&path);
    }
    FileLock::try_exclusive(&path)?.ok_or_else(|| InstallError::Busy {
        name: name.to_string(),
        lock: path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_exclusive_lock_acquired() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("locks/test.lock");
        let lock = FileLock::exclusive(&lock_path).unwrap();
        assert!(lock_path.exists());
        assert_eq!(lock.path(), lock_path.as_path());
        drop(lock);
    }

    #[test]
    fn test_try_exclusive_returns_none_when_held() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("test.lock");
        let _lock = FileLock::exclusive(&lock_path).unwrap();
        let result = FileLock::try_exclusive(&lock_path).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_lock_released_on_drop() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("test.lock");
        {
            let _lock = FileLock::exclusive(&lock_path).unwrap();
        }
        let lock = FileLock::try_exclusive(&lock_path).unwrap();
        assert!(lock.is_some());
    }

    #[test]
    fn test_lock_tool_busy_when_held() {
        let dir = TempDir::new().unwrap();
        let paths = PrefixPaths::from_root(dir.path().to_path_buf());
        let _held = lock_tool(&paths, "aws-jumpcloud", false).unwrap();
        let err = lock_tool(&paths, "aws-jumpcloud", false).unwrap_err();
        assert_eq!(err.kind(), "busy");
        // Other tools are independent resources.
        assert!(lock_tool(&paths, "other-tool", false).is_ok());
    }
}
