//! Error taxonomy for the install procedure.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("checksum mismatch for {source_ref}\n  expected: {expected}\n  actual:   {actual}")]
    Integrity {
        source_ref: String,
        expected: String,
        actual: String,
    },

    #[error("missing dependency {requirement}: {detail}")]
    Dependency { requirement: String, detail: String },

    #[error("fetch {url}: {detail}")]
    Fetch { url: String, detail: String },

    /// Build tool output has already been shown to the operator.
    #[error("{step} failed ({})", exit_label(.code))]
    Build { step: String, code: Option<i32> },

    #[error("conflict: {count} packages registered as '{name}' in {}", .env.display())]
    Conflict {
        name: String,
        count: usize,
        env: PathBuf,
    },

    #[error("link {}: {detail}", .path.display())]
    Link { path: PathBuf, detail: String },

    #[error("smoke test failed: `{command}` output does not contain '{expected}'\n{output}")]
    Verification {
        command: String,
        expected: String,
        output: String,
    },

    #[error("another install of '{name}' holds {}", .lock.display())]
    Busy { name: String, lock: PathBuf },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {}", c),
        None => "terminated by signal".to_string(),
    }
}

impl InstallError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Short label for history entries.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Integrity { .. } => "integrity",
            Self::Dependency { .. } => "dependency",
            Self::Fetch { .. } => "fetch",
            Self::Build { .. } => "build",
            Self::Conflict { .. } => "conflict",
            Self::Link { .. } => "link",
            Self::Verification { .. } => "verification",
            Self::Busy { .. } => "busy",
            Self::Io { .. } => "io",
        }
    }
}

/// Attach context to `io::Result` values, `anyhow`-style.
pub trait IoContext<T> {
    fn io_context<F, S>(self, f: F) -> Result<T, InstallError>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn io_context<F, S>(self, f: F) -> Result<T, InstallError>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| InstallError::io(f(), e))
    }
}
