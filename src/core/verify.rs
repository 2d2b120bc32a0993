//! Post-install smoke test.
//!
//! Black-box liveness only: the executable starts, parses its arguments,
//! and advertises the expected subcommand.

use crate::core::error::InstallError;
use crate::models::formula::TestSpec;
use crate::util::process;
use std::path::Path;
use std::process::Command;

/// Run `exe <args>` and require `spec.expect` in its combined output.
pub fn smoke_test(exe: &Path, spec: &TestSpec) -> Result<String, InstallError> {
    let mut cmd = Command::new(exe);
    cmd.args(&spec.args);
    let command = process::describe(&cmd);
    tracing::info!(%command, expect = %spec.expect, "smoke test");

    let output = match process::capture(&mut cmd) {
        Ok(out) => out.combined(),
        Err(e) => {
            return Err(InstallError::Verification {
                command,
                expected: spec.expect.clone(),
                output: format!("failed to start: {}", e),
            })
        }
    };

    if output.contains(&spec.expect) {
        return Ok(output);
    }
    Err(InstallError::Verification {
        command,
        expected: spec.expect.clone(),
        output,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_support;
    use tempfile::TempDir;

    #[test]
    fn test_passes_when_subcommand_listed() {
        let dir = TempDir::new().unwrap();
        let exe = test_support::write_script(
            dir.path(),
            "aws-jumpcloud",
            "echo 'usage: aws-jumpcloud <command>'\necho '  rotate   Rotate AWS keys'",
        );
        let out = smoke_test(&exe, &TestSpec::default()).unwrap();
        assert!(out.contains("rotate"));
    }

    #[test]
    fn test_fails_when_subcommand_missing() {
        let dir = TempDir::new().unwrap();
        let exe = test_support::write_script(dir.path(), "tool", "echo 'usage: tool list'");
        let err = smoke_test(&exe, &TestSpec::default()).unwrap_err();
        assert_eq!(err.kind(), "verification");
        assert!(err.to_string().contains("help"));
    }

    #[test]
    fn test_stderr_counts_as_output() {
        let dir = TempDir::new().unwrap();
        let exe = test_support::write_script(dir.path(), "tool", "echo 'rotate' >&2\nexit 2");
        assert!(smoke_test(&exe, &TestSpec::default()).is_ok());
    }

    #[test]
    fn test_missing_executable_is_verification_failure() {
        let dir = TempDir::new().unwrap();
        let err = smoke_test(&dir.path().join("nope"), &TestSpec::default()).unwrap_err();
        assert_eq!(err.kind(), "verification");
    }
}
