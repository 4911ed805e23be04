//! runner.rs - Synchronous execution of external commands with captured output.
//!
//! This module is the ONLY sanctioned way the installer touches external
//! programs (`apt-get`, `docker`, `ufw`, ...). Routing everything through it
//! ensures:
//!
//! - Uniform output capture (lossy UTF-8, exit-code preservation)
//! - A single dry-run gate for every mutating command
//! - Consistent logging of the exact command line executed
//!
//! Three entry points with distinct failure policies:
//!
//! - [`run`] - probes; spawn failures are errors, non-zero exit is not
//! - [`run_checked`] - hard steps; non-zero exit aborts with stderr excerpt
//! - [`run_tolerant`] - soft steps; any failure is logged and swallowed

use crate::error::{InstallError, Result};
use log::{debug, info, warn};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};

/// Global dry-run flag.
///
/// When set, mutating commands ([`run_checked`], [`run_tolerant`]) are logged
/// and skipped. Probes via [`run`] still execute so detection output stays
/// realistic during a preview.
static DRY_RUN: AtomicBool = AtomicBool::new(false);

/// Enable dry-run mode (no mutating commands will be executed)
pub fn enable_dry_run() {
    DRY_RUN.store(true, Ordering::SeqCst);
    info!("Dry-run mode enabled - mutating commands will be logged, not executed");
}

/// Disable dry-run mode
pub fn disable_dry_run() {
    DRY_RUN.store(false, Ordering::SeqCst);
}

/// Check if dry-run mode is active
pub fn is_dry_run() -> bool {
    DRY_RUN.load(Ordering::SeqCst)
}

/// Captured result of an external command execution.
#[derive(Debug, Clone)]
pub struct CmdOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub success: bool,
}

impl CmdOutput {
    /// Synthetic success used when dry-run skips a command.
    fn skipped() -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: Some(0),
            success: true,
        }
    }
}

impl From<std::process::Output> for CmdOutput {
    fn from(output: std::process::Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
            success: output.status.success(),
        }
    }
}

/// Render a command line for logs and error messages.
fn display_command(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

/// Execute a read-only probe command and capture its output.
///
/// Non-zero exit is NOT an error here; callers inspect `success` themselves
/// (e.g. `docker network inspect` probing for existence). Only a failure to
/// spawn the process at all is reported as an error.
pub fn run(program: &str, args: &[&str]) -> Result<CmdOutput> {
    debug!("probe: {}", display_command(program, args));

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            InstallError::system(format!(
                "failed to spawn '{}': {}",
                display_command(program, args),
                e
            ))
        })?;

    Ok(CmdOutput::from(output))
}

/// Execute a mutating command that must succeed.
///
/// Honors dry-run. On non-zero exit, returns a `System` error carrying the
/// command line and a stderr excerpt; the caller is expected to abort.
pub fn run_checked(program: &str, args: &[&str]) -> Result<CmdOutput> {
    run_checked_env(program, args, &[])
}

/// [`run_checked`] with extra environment variables (e.g. DEBIAN_FRONTEND).
pub fn run_checked_env(program: &str, args: &[&str], envs: &[(&str, &str)]) -> Result<CmdOutput> {
    let cmdline = display_command(program, args);

    if is_dry_run() {
        info!("DRY RUN: would execute: {}", cmdline);
        return Ok(CmdOutput::skipped());
    }

    debug!("exec: {} env={:?}", cmdline, envs);

    let mut cmd = Command::new(program);
    cmd.args(args).stdin(Stdio::null());
    for (key, value) in envs {
        cmd.env(key, value);
    }

    let output = cmd
        .output()
        .map_err(|e| InstallError::system(format!("failed to spawn '{}': {}", cmdline, e)))?;
    let output = CmdOutput::from(output);

    if output.success {
        Ok(output)
    } else {
        let code = output.exit_code.unwrap_or(-1);
        Err(InstallError::system(format!(
            "'{}' failed with exit code {}: {}",
            cmdline,
            code,
            output.stderr.trim()
        )))
    }
}

/// Execute a mutating command on a best-effort basis.
///
/// Failures (spawn or non-zero exit) are logged as warnings and swallowed;
/// the pipeline continues. Returns whether the command actually succeeded.
pub fn run_tolerant(program: &str, args: &[&str]) -> bool {
    let cmdline = display_command(program, args);

    if is_dry_run() {
        info!("DRY RUN: would execute: {}", cmdline);
        return true;
    }

    match run(program, args) {
        Ok(output) if output.success => true,
        Ok(output) => {
            warn!(
                "'{}' failed with exit code {} (continuing): {}",
                cmdline,
                output.exit_code.unwrap_or(-1),
                output.stderr.trim()
            );
            false
        }
        Err(e) => {
            warn!("'{}' could not be executed (continuing): {}", cmdline, e);
            false
        }
    }
}
