//! Process execution for uplift.
//!
//! Every external collaborator of the pipeline is a subprocess: the
//! package-script build runner, the `aws` CLI, `git`, and the system
//! clipboard tool. This crate provides the thin execution layer with
//! captured or streamed output.
//!
//! # Example
//!
//! ```ignore
//! use uplift_process::run_command;
//!
//! let result = run_command("git", &["--version"]).expect("run");
//! assert!(result.success);
//! ```

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Result of a command execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// Whether the command succeeded (exit code 0).
    pub success: bool,
    /// Exit code (if available).
    pub exit_code: Option<i32>,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
    /// Duration of execution.
    pub duration_ms: u64,
}

impl CommandResult {
    /// Convert a failed command into an error carrying its stderr.
    pub fn ok(&self) -> Result<&Self> {
        if self.success {
            Ok(self)
        } else {
            Err(anyhow::anyhow!(
                "command failed with exit code {:?}: {}",
                self.exit_code,
                self.stderr.trim()
            ))
        }
    }

    fn from_output(output: &Output, duration: Duration) -> Self {
        Self {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms: duration.as_millis() as u64,
        }
    }
}

/// Run a command and capture its output.
pub fn run_command(program: &str, args: &[&str]) -> Result<CommandResult> {
    let start = std::time::Instant::now();

    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("failed to run command: {} {:?}", program, args))?;

    Ok(CommandResult::from_output(&output, start.elapsed()))
}

/// Run a command in a specific directory, capturing output.
pub fn run_command_in_dir(program: &str, args: &[&str], dir: &Path) -> Result<CommandResult> {
    let start = std::time::Instant::now();

    let output = Command::new(program)
        .args(args)
        .current_dir(dir)
        .output()
        .with_context(|| {
            format!(
                "failed to run command: {} {:?} in {}",
                program,
                args,
                dir.display()
            )
        })?;

    Ok(CommandResult::from_output(&output, start.elapsed()))
}

/// Run a command in a directory, streaming output to the operator's
/// terminal. Used for build commands where progress matters more than
/// capture.
pub fn run_streaming_in_dir(program: &str, args: &[&str], dir: &Path) -> Result<CommandResult> {
    let start = std::time::Instant::now();

    let output = Command::new(program)
        .args(args)
        .current_dir(dir)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .output()
        .with_context(|| {
            format!(
                "failed to run command: {} {:?} in {}",
                program,
                args,
                dir.display()
            )
        })?;

    Ok(CommandResult::from_output(&output, start.elapsed()))
}

/// Pipe `input` into a command's stdin and wait for it to finish.
/// Used for clipboard tools (`pbcopy`, `xclip`, `wl-copy`).
pub fn pipe_to_command(program: &str, args: &[&str], input: &str) -> Result<()> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to spawn {program}"))?;

    child
        .stdin
        .take()
        .context("child stdin unavailable")?
        .write_all(input.as_bytes())
        .with_context(|| format!("failed to write to {program} stdin"))?;

    let status = child
        .wait()
        .with_context(|| format!("failed to wait for {program}"))?;

    if !status.success() {
        return Err(anyhow::anyhow!(
            "{program} exited with {:?}",
            status.code()
        ));
    }
    Ok(())
}

/// Check if a command exists in PATH.
pub fn command_exists(program: &str) -> bool {
    which::which(program).is_ok()
}
