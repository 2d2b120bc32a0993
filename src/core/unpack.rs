//! Source tarball extraction.

use crate::core::error::{InstallError, IoContext};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tar::Archive;

/// Extract a `.tar.gz` into `dest` and return the source root.
///
/// Release tarballs wrap everything in one `<name>-<version>/` directory;
/// when that is the only top-level entry it becomes the root.
pub fn extract_tarball(tarball: &Path, dest: &Path) -> Result<PathBuf, InstallError> {
    let file = File::open(tarball).io_context(|| format!("open {}", tarball.display()))?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive.set_preserve_permissions(true);

    let entries = archive
        .entries()
        .io_context(|| format!("read {}", tarball.display()))?;
    for entry in entries {
        let mut entry = entry.io_context(|| format!("read entry in {}", tarball.display()))?;
        let entry_path = entry
            .path()
            .io_context(|| format!("read entry path in {}", tarball.display()))?
            .into_owned();
        let inside = entry
            .unpack_in(dest)
            .io_context(|| format!("extract {}", entry_path.display()))?;
        if !inside {
            return Err(InstallError::io(
                format!("extract {}", tarball.display()),
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("entry escapes build directory: {}", entry_path.display()),
                ),
            ));
        }
    }

    source_root(dest)
}

fn source_root(dest: &Path) -> Result<PathBuf, InstallError> {
    let mut top: Vec<PathBuf> = fs::read_dir(dest)
        .io_context(|| format!("read {}", dest.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();
    if top.len() == 1 && top[0].is_dir() {
        return Ok(top.remove(0));
    }
    Ok(dest.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use tempfile::TempDir;

    #[test]
    fn test_single_top_level_dir_is_root() {
        let dir = TempDir::new().unwrap();
        let (tarball, _) = test_support::source_tarball(dir.path(), "aws-jumpcloud-2.1.3");
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        let root = extract_tarball(&tarball, &out).unwrap();
        assert_eq!(root, out.join("aws-jumpcloud-2.1.3"));
        assert!(root.join("setup.py").is_file());
    }

    #[test]
    fn test_flat_tarball_root_is_dest() {
        let dir = TempDir::new().unwrap();
        let tarball = test_support::write_tarball(
            dir.path(),
            "flat.tar.gz",
            &[("setup.py", "x"), ("README.md", "y")],
        );
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        assert_eq!(extract_tarball(&tarball, &out).unwrap(), out);
    }

    #[test]
    fn test_not_gzip_is_error() {
        let dir = TempDir::new().unwrap();
        let bogus = dir.path().join("bogus.tar.gz");
        fs::write(&bogus, b"not a tarball").unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        assert!(extract_tarball(&bogus, &out).is_err());
    }
}
