//! Utility modules for filesystem, process, and host checks.

pub mod fs;
pub mod logging;
pub mod privilege;
pub mod process;
