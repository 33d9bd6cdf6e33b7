//! Child-process invocation for external documentation tools.
//!
//! Wraps `std::process::Command` so every invocation comes back with its
//! exit status, captured streams, and timing. The pipeline decides what a
//! failure means; nothing here aborts the build on its own.

use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, instrument, warn};

use docbuild_shared::{DocBuildError, Result, ToolConfig};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// An external tool invocation template: command plus base arguments.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    /// Executable name or path.
    pub command: String,
    /// Arguments always passed before any per-invocation argument.
    pub args: Vec<String>,
}

impl ToolSpec {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

impl From<&ToolConfig> for ToolSpec {
    fn from(config: &ToolConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
        }
    }
}

/// Outcome of one tool invocation.
#[derive(Debug)]
pub struct ToolRun {
    /// Exit code, if the process exited normally (absent when killed by a
    /// signal).
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: Vec<u8>,
    /// Captured standard error, lossily decoded.
    pub stderr: String,
    /// Wall-clock duration of the invocation.
    pub duration: Duration,
}

impl ToolRun {
    /// Whether the tool exited with status zero.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// A short failure description built from the exit code and stderr.
    pub fn failure_detail(&self) -> String {
        let trimmed = self.stderr.trim();
        match (self.exit_code, trimmed.is_empty()) {
            (Some(code), true) => format!("exited with status {code}"),
            (Some(code), false) => format!("exited with status {code}: {trimmed}"),
            (None, true) => "terminated by signal".into(),
            (None, false) => format!("terminated by signal: {trimmed}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

/// Run a tool synchronously in the current working directory, blocking
/// until it exits. Both streams are captured; stderr is re-emitted through
/// tracing so external-tool diagnostics stay visible on the console.
///
/// A non-zero exit is NOT an error here. Only a spawn failure (missing
/// executable, permission denied) returns `Err`.
#[instrument(skip_all, fields(command = %spec.command))]
pub fn run(spec: &ToolSpec, extra_args: &[&OsStr]) -> Result<ToolRun> {
    let start = Instant::now();

    let output = Command::new(&spec.command)
        .args(&spec.args)
        .args(extra_args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            DocBuildError::tool(format!(
                "failed to run `{}`: {e}. Is it installed?",
                spec.command
            ))
        })?;

    let run = ToolRun {
        exit_code: output.status.code(),
        stdout: output.stdout,
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        duration: start.elapsed(),
    };

    if run.success() {
        debug!(
            stdout_len = run.stdout.len(),
            elapsed_ms = run.duration.as_millis() as u64,
            "tool completed"
        );
        if !run.stderr.trim().is_empty() {
            debug!(stderr = %run.stderr.trim(), "tool stderr");
        }
    } else {
        warn!(
            exit_code = ?run.exit_code,
            stderr = %run.stderr.trim(),
            "tool failed"
        );
    }

    Ok(run)
}

/// Run a tool and write its captured stdout to `dest`, truncating any prior
/// content. The write happens even when the tool exits non-zero, matching
/// shell redirection semantics; a spawn failure leaves `dest` untouched.
pub fn capture_to_file(spec: &ToolSpec, extra_args: &[&OsStr], dest: &Path) -> Result<ToolRun> {
    let run = run(spec, extra_args)?;

    std::fs::write(dest, &run.stdout).map_err(|e| DocBuildError::io(dest, e))?;
    debug!(
        dest = %dest.display(),
        bytes = run.stdout.len(),
        "wrote captured stdout"
    );

    Ok(run)
}

/// Probe a tool for availability by running it with its probe arguments
/// (typically `--version`). Returns the first line of its stdout.
pub fn probe(spec: &ToolSpec, probe_args: &[String]) -> Result<String> {
    let args: Vec<&OsStr> = probe_args.iter().map(OsStr::new).collect();
    let run = run(spec, &args)?;

    if !run.success() {
        return Err(DocBuildError::tool(format!(
            "`{}` probe failed: {}",
            spec.command,
            run.failure_detail()
        )));
    }

    let first_line = String::from_utf8_lossy(&run.stdout)
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();
    Ok(first_line)
}
