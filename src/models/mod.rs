//! Data structures shared across commands.

pub mod formula;
pub mod receipt;
pub mod settings;
