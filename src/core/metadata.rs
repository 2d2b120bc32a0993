//! Settings and install receipts on disk.

use crate::constants;
use crate::core::error::{InstallError, IoContext};
use crate::core::paths::PrefixPaths;
use crate::models::receipt::InstallReceipt;
use crate::models::settings::SettingsFile;
use crate::util::fs as prefix_fs;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub fn load_settings(path: &Path) -> Result<SettingsFile> {
    if !path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("read settings {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parse settings {}", path.display()))
}

pub fn save_settings(path: &Path, settings: &SettingsFile) -> Result<()> {
    let content = toml::to_string_pretty(settings).context("serialize settings")?;
    prefix_fs::write_atomic(path, content.as_bytes(), constants::METADATA_FILE_MODE)
        .with_context(|| format!("write settings {}", path.display()))
}

pub fn save_receipt(path: &Path, receipt: &InstallReceipt) -> Result<(), InstallError> {
    let content = serde_json::to_vec_pretty(receipt).map_err(|e| {
        InstallError::io("serialize receipt", std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })?;
    prefix_fs::write_atomic(path, &content, constants::METADATA_FILE_MODE)
        .io_context(|| format!("write receipt {}", path.display()))
}

pub fn load_receipt(path: &Path) -> Result<InstallReceipt> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("read receipt {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parse receipt {}", path.display()))
}

/// Receipts of every installed keg, sorted by name then version.
/// Unreadable receipts are reported and skipped.
pub fn list_receipts(paths: &PrefixPaths, name: Option<&str>) -> Result<Vec<InstallReceipt>> {
    let rack = name.unwrap_or("*");
    let pattern = paths
        .cellar
        .join(rack)
        .join("*")
        .join(constants::RECEIPT_FILE);
    let pattern = pattern.to_string_lossy().into_owned();

    let mut receipts = Vec::new();
    for entry in glob::glob(&pattern).with_context(|| format!("bad glob {}", pattern))? {
        let path = match entry {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("skipping unreadable cellar entry: {}", e);
                continue;
            }
        };
        if is_parked_keg(&path) {
            continue;
        }
        match load_receipt(&path) {
            Ok(r) => receipts.push(r),
            Err(e) => tracing::warn!("{:#}", e),
        }
    }
    receipts.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version)));
    Ok(receipts)
}

fn is_parked_keg(receipt: &Path) -> bool {
    receipt
        .parent()
        .and_then(|keg| keg.file_name())
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with(&format!(".{}", constants::PREVIOUS_SUFFIX)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::receipt::ReceiptSource;
    use crate::models::settings::BuildPolicy;
    use chrono::Utc;
    use tempfile::TempDir;

    fn receipt(name: &str, version: &str, paths: &PrefixPaths) -> InstallReceipt {
        InstallReceipt {
            name: name.into(),
            version: version.into(),
            source: ReceiptSource::Path {
                path: "/src".into(),
            },
            installed_at: Utc::now(),
            build_policy: BuildPolicy::FromSource,
            backend: "test".into(),
            environment: paths.env_dir(name, version),
            entry_points: vec![name.into()],
        }
    }

    #[test]
    fn test_missing_settings_default() {
        let dir = TempDir::new().unwrap();
        let s = load_settings(&dir.path().join("venvtap.toml")).unwrap();
        assert!(s.policy.verify_after_install);
    }

    #[test]
    fn test_settings_save_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("venvtap.toml");
        let mut s = SettingsFile::default();
        s.policy.build = BuildPolicy::AllowBinary;
        save_settings(&path, &s).unwrap();
        assert_eq!(load_settings(&path).unwrap().policy.build, BuildPolicy::AllowBinary);
    }

    #[test]
    fn test_list_receipts_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        let paths = PrefixPaths::from_root(dir.path().to_path_buf());
        for (n, v) in [("zeta", "1.0"), ("aws-jumpcloud", "2.1.3"), ("aws-jumpcloud", "2.1.2")] {
            save_receipt(&paths.receipt(n, v), &receipt(n, v, &paths)).unwrap();
        }
        let parked = paths.previous_keg("zeta", "1.0").join(constants::RECEIPT_FILE);
        save_receipt(&parked, &receipt("zeta", "1.0", &paths)).unwrap();
        fs::create_dir_all(paths.keg("broken", "0.1")).unwrap();
        fs::write(paths.receipt("broken", "0.1"), "{").unwrap();

        let all = list_receipts(&paths, None).unwrap();
        let ids: Vec<_> = all.iter().map(|r| format!("{}@{}", r.name, r.version)).collect();
        assert_eq!(ids, vec!["aws-jumpcloud@2.1.2", "aws-jumpcloud@2.1.3", "zeta@1.0"]);

        let one = list_receipts(&paths, Some("zeta")).unwrap();
        assert_eq!(one.len(), 1);
    }
}
