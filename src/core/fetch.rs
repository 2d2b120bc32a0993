//! Artifact acquisition: download, verify, and stage a build tree.

use crate::constants;
use crate::core::checksum;
use crate::core::error::{InstallError, IoContext};
use crate::core::paths::PrefixPaths;
use crate::core::unpack;
use crate::models::formula::{Artifact, HeadSpec};
use crate::models::receipt::ReceiptSource;
use crate::util::process;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tempfile::TempDir;

/// What to build from.
#[derive(Debug, Clone)]
pub enum Source {
    /// Released tarball, verified against the formula's sha256.
    Tarball(Artifact),
    /// Branch tip of the formula's repository.
    Head(HeadSpec),
    /// Local working tree, used in place.
    Path(PathBuf),
}

impl Source {
    pub fn receipt_source(&self) -> ReceiptSource {
        match self {
            Self::Tarball(a) => ReceiptSource::Tarball {
                url: a.url.clone(),
                sha256: a.sha256.clone(),
            },
            Self::Head(h) => ReceiptSource::Head {
                url: h.url.clone(),
                branch: h.branch.clone(),
            },
            Self::Path(p) => ReceiptSource::Path { path: p.clone() },
        }
    }
}

/// A source tree ready to hand to the build backend.
#[derive(Debug)]
pub struct BuildTree {
    pub dir: PathBuf,
    pub source: ReceiptSource,
    _scratch: Option<TempDir>,
}

/// Fetch (or reuse) the tarball for `artifact` and verify its hash.
///
/// Bytes land in a temp file beside the cache entry and are persisted only
/// once the digest matches, so a mismatch leaves nothing behind.
pub fn fetch_artifact(paths: &PrefixPaths, artifact: &Artifact) -> Result<PathBuf, InstallError> {
    let cached = paths.cached_artifact(&artifact.name, &artifact.version);
    if cached.is_file() {
        let actual = checksum::sha256_file(&cached)?;
        if actual.eq_ignore_ascii_case(&artifact.sha256) {
            tracing::info!(path = %cached.display(), "using cached download");
            return Ok(cached);
        }
        tracing::warn!(path = %cached.display(), "cached download has a stale checksum; refetching");
        fs::remove_file(&cached).io_context(|| format!("remove {}", cached.display()))?;
    }

    fs::create_dir_all(&paths.cache)
        .io_context(|| format!("create dir {}", paths.cache.display()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(&paths.cache)
        .io_context(|| format!("create temp file in {}", paths.cache.display()))?;

    tracing::info!(url = %artifact.url, "downloading");
    let mut reader = open_url(&artifact.url)?;
    io::copy(&mut reader, tmp.as_file_mut()).map_err(|e| InstallError::Fetch {
        url: artifact.url.clone(),
        detail: e.to_string(),
    })?;

    let actual = checksum::sha256_file(tmp.path())?;
    checksum::ensure_matches(&artifact.url, &artifact.sha256, &actual)?;

    tmp.persist(&cached)
        .map_err(|e| InstallError::io(format!("persist {}", cached.display()), e.error))?;
    tracing::info!(sha256 = %actual, "checksum verified");
    Ok(cached)
}

/// Open an `http(s)://` URL, a `file://` URL, or a plain path.
pub fn open_url(url: &str) -> Result<Box<dyn Read + Send>, InstallError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(30))
            .build();
        let response = agent.get(url).call().map_err(|e| InstallError::Fetch {
            url: url.to_string(),
            detail: match &e {
                ureq::Error::Status(code, _) => format!("HTTP {}", code),
                ureq::Error::Transport(t) => t.to_string(),
            },
        })?;
        return Ok(Box::new(response.into_reader()));
    }

    let path = url.strip_prefix("file://").unwrap_or(url);
    let file = File::open(path).map_err(|e| InstallError::Fetch {
        url: url.to_string(),
        detail: e.to_string(),
    })?;
    Ok(Box::new(file))
}

/// Produce a build tree for `source`. Integrity failures surface here,
/// before anything touches the environment.
pub fn prepare(paths: &PrefixPaths, source: &Source) -> Result<BuildTree, InstallError> {
    match source {
        Source::Tarball(artifact) => {
            let tarball = fetch_artifact(paths, artifact)?;
            let scratch = scratch_dir()?;
            let dir = unpack::extract_tarball(&tarball, scratch.path())?;
            Ok(BuildTree {
                dir,
                source: source.receipt_source(),
                _scratch: Some(scratch),
            })
        }
        Source::Head(head) => {
            let scratch = scratch_dir()?;
            let dir = scratch.path().join("src");
            clone_head(head, &dir)?;
            Ok(BuildTree {
                dir,
                source: source.receipt_source(),
                _scratch: Some(scratch),
            })
        }
        Source::Path(path) => {
            if !path.is_dir() {
                return Err(InstallError::Fetch {
                    url: path.display().to_string(),
                    detail: "not a directory".to_string(),
                });
            }
            let dir = path
                .canonicalize()
                .io_context(|| format!("resolve {}", path.display()))?;
            Ok(BuildTree {
                dir,
                source: source.receipt_source(),
                _scratch: None,
            })
        }
    }
}

fn scratch_dir() -> Result<TempDir, InstallError> {
    tempfile::Builder::new()
        .prefix("venvtap-build-")
        .tempdir()
        .io_context(|| "create build directory")
}

fn clone_head(head: &HeadSpec, dest: &Path) -> Result<(), InstallError> {
    let branch = if head.branch.is_empty() {
        constants::DEFAULT_HEAD_BRANCH
    } else {
        head.branch.as_str()
    };
    let mut cmd = Command::new("git");
    cmd.args(["clone", "--depth", "1", "--branch", branch])
        .arg(&head.url)
        .arg(dest);
    tracing::info!(url = %head.url, branch, "cloning head");
    let status = process::stream(&mut cmd).map_err(|e| InstallError::Fetch {
        url: head.url.clone(),
        detail: format!("run git: {}", e),
    })?;
    if !status.success() {
        return Err(InstallError::Fetch {
            url: head.url.clone(),
            detail: format!("git clone exited with {}", status),
        });
    }
    Ok(())
}
