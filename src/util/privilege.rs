//! Privilege checks for refusing root installs.

use anyhow::{bail, Result};

/// Check if the current process is running as root (euid 0).
pub fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Refuse `action` when running as root unless explicitly allowed.
pub fn refuse_root(action: &str, allow_root: bool) -> Result<()> {
    if is_root() && !allow_root {
        bail!(
            "'{}' should not run as root; virtualenvs would end up root-owned. \
             Set policy.allow_root = true in venvtap.toml to override.",
            action
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refuse_root_allowed_always_passes() {
        assert!(refuse_root("install", true).is_ok());
    }

    #[test]
    fn test_refuse_root_matches_euid() {
        assert_eq!(refuse_root("install", false).is_ok(), !is_root());
    }
}
