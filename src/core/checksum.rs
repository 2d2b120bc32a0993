//! SHA-256 integrity checks for artifacts.

use crate::core::error::{InstallError, IoContext};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Hex-encoded SHA-256 of everything `reader` yields.
pub fn sha256_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:064x}", hasher.finalize()))
}

pub fn sha256_file(path: &Path) -> Result<String, InstallError> {
    let file = File::open(path).io_context(|| format!("open {}", path.display()))?;
    sha256_reader(file).io_context(|| format!("read {}", path.display()))
}

pub fn sha256_bytes(bytes: &[u8]) -> String {
    format!("{:064x}", Sha256::digest(bytes))
}

/// Compare an actual digest against the declared one.
pub fn ensure_matches(source_ref: &str, expected: &str, actual: &str) -> Result<(), InstallError> {
    if expected.eq_ignore_ascii_case(actual) {
        return Ok(());
    }
    Err(InstallError::Integrity {
        source_ref: source_ref.to_string(),
        expected: expected.to_ascii_lowercase(),
        actual: actual.to_ascii_lowercase(),
    })
}
