//! External command execution.
//!
//! Build steps stream straight to the terminal so the underlying tool's
//! output reaches the operator unmodified; queries capture their output.

use std::io;
use std::process::{Command, ExitStatus, Stdio};

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code, or `None` when terminated by a signal.
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    /// stdout followed by stderr, the way a terminal would show them.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&self.stderr);
        }
        out
    }
}

/// Run a command and capture stdout/stderr without judging the exit status.
pub fn capture(cmd: &mut Command) -> io::Result<CommandOutput> {
    tracing::debug!(command = %describe(cmd), "capture");
    let output = cmd.stdin(Stdio::null()).output()?;
    Ok(CommandOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Run a command with inherited stdout/stderr.
pub fn stream(cmd: &mut Command) -> io::Result<ExitStatus> {
    tracing::debug!(command = %describe(cmd), "stream");
    cmd.stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
}

/// Render a command line for logs and error messages.
pub fn describe(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}
