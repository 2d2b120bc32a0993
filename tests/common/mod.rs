//! Shared helpers for CLI integration tests.

use assert_cmd::Command;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A throwaway prefix plus a scratch area for formulas and artifacts.
pub struct TestPrefix {
    #[allow(dead_code)]
    pub temp: TempDir,
    pub prefix: PathBuf,
    pub work: PathBuf,
}

impl TestPrefix {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("create temp dir");
        let prefix = temp.path().join("prefix");
        let work = temp.path().join("work");
        std::fs::create_dir_all(&work).expect("create work dir");
        Self { temp, prefix, work }
    }

    /// `venvtap --prefix <prefix>` with environment overrides cleared.
    #[allow(deprecated)]
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("venvtap").expect("binary built");
        cmd.env_remove("VENVTAP_PREFIX");
        cmd.env_remove("VENVTAP_PYTHON");
        cmd.env_remove("VENVTAP_NON_INTERACTIVE");
        cmd.env("VENVTAP_LOG", "off");
        cmd.arg("--prefix").arg(&self.prefix);
        cmd
    }

    pub fn write(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.work.join(name);
        std::fs::write(&path, content).expect("write file");
        path
    }

    /// Write a formula pointing at `url` with the given digest.
    pub fn formula(&self, url: &Path, sha256: &str) -> PathBuf {
        let body = format!(
            r#"name = "aws-jumpcloud"
version = "2.1.3"
url = "{}"
sha256 = "{}"

[depends_on]
python = "3.8"
"#,
            url.display(),
            sha256
        );
        self.write("aws-jumpcloud.toml", body.as_bytes())
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

pub fn template_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("formula/aws-jumpcloud.toml.in")
}
