//! Conflict-safe installer for Python command-line tools.
//!
//! Reads a TOML formula, fetches and checksum-verifies the release
//! tarball, builds it into an isolated virtualenv, removes same-name
//! registrations left in that environment, and links the entry points
//! onto a stable host path.
//!
//! ## Modules
//! - `cli`: Command-line handlers
//! - `core`: Install logic (fetch, backend, installer, verify, history)
//! - `models`: Data structures (formula, receipt, settings)
//! - `util`: System utilities (fs, process, privilege, logging)

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;
