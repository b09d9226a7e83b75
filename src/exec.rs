//! Process execution helpers.
use anyhow::{Context, Result, bail};
use std::path::Path;
use std::process::{Command, Output};

/// Result of a command execution.
#[derive(Debug)]
pub struct ExecResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, if the process was not killed by a signal.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

fn command(dir: &Path, program: &str, args: &[String], env: &[(String, String)]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args).current_dir(dir);
    for (k, v) in env {
        cmd.env(k, v);
    }
    cmd
}

/// Run a command in `dir` with extra environment variables, bailing on
/// non-zero exit.
pub fn run_in_with_env(
    dir: &Path,
    program: &str,
    args: &[String],
    env: &[(String, String)],
) -> Result<ExecResult> {
    let label = format!("{program} in {}", dir.display());
    let result = run_unchecked_in_with_env(dir, program, args, env)?;
    if !result.success {
        bail!(
            "{label} failed (exit {}): {}",
            result.code.unwrap_or(-1),
            result.stderr.trim()
        );
    }
    Ok(result)
}

/// Like [`run_in_with_env`] but returns the result without bailing.
pub fn run_unchecked_in_with_env(
    dir: &Path,
    program: &str,
    args: &[String],
    env: &[(String, String)],
) -> Result<ExecResult> {
    let output = command(dir, program, args, env)
        .output()
        .with_context(|| format!("failed to execute: {program}"))?;
    Ok(ExecResult::from(output))
}

/// Check if a program is available on PATH.
#[must_use]
pub fn which(program: &str) -> bool {
    which::which(program).is_ok()
}
