//! Pre-flight checks and host detection for the installer
//!
//! This module verifies the environment before any step mutates the host:
//! - Required binaries are present
//! - Running with root privileges (EUID 0)
//!
//! It also performs the best-effort host detections the rendered
//! configuration depends on: distribution codename, first global-scope IPv4
//! address, and system timezone. Detections never fail - each one substitutes
//! a documented default and logs a warning instead.

use crate::runner;
use log::{debug, info, warn};
use std::fs;

/// Codename substituted when `lsb_release` and /etc/os-release both fail.
pub const DEFAULT_CODENAME: &str = "noble";

/// Address substituted when no global-scope IPv4 address is found.
pub const FALLBACK_ADDRESS: &str = "localhost";

/// Timezone substituted when detection fails.
pub const DEFAULT_TIMEZONE: &str = "Etc/UTC";

/// Required binaries for the install pipeline
const REQUIRED_BINARIES: &[&str] = &[
    "apt-get",    // Package installation
    "curl",       // Docker signing key download
    "gpg",        // Keyring dearmor
    "systemctl",  // Docker service activation
];

/// Result of environment verification
#[derive(Debug)]
pub struct PreflightResult {
    pub missing_binaries: Vec<String>,
    pub is_root: bool,
}

impl PreflightResult {
    /// Returns true if all checks passed
    pub fn is_ok(&self) -> bool {
        self.missing_binaries.is_empty() && self.is_root
    }
}

/// Check if a binary is available in PATH
pub fn binary_exists(name: &str) -> bool {
    runner::run("which", &[name])
        .map(|output| output.success)
        .unwrap_or(false)
}

/// Check if running as root (EUID 0)
fn is_running_as_root() -> bool {
    // Using nix crate for reliable EUID check
    nix::unistd::geteuid().is_root()
}

/// Skip root check (for development/testing)
/// Set FLOWSTACK_SKIP_ROOT_CHECK=1 to skip
pub fn should_skip_root_check() -> bool {
    std::env::var("FLOWSTACK_SKIP_ROOT_CHECK")
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false)
}

/// Perform all sanity checks and return the result
pub fn verify_environment() -> PreflightResult {
    let mut missing = Vec::new();

    for binary in REQUIRED_BINARIES {
        if !binary_exists(binary) {
            missing.push((*binary).to_string());
        }
    }

    PreflightResult {
        missing_binaries: missing,
        is_root: is_running_as_root(),
    }
}

/// Print a pretty error message to stderr and exit
pub fn print_error_and_exit(result: &PreflightResult) -> ! {
    eprintln!();
    eprintln!("╔══════════════════════════════════════════════════════════════════╗");
    eprintln!("║               FlowStack - Pre-flight Check Failed                ║");
    eprintln!("╚══════════════════════════════════════════════════════════════════╝");
    eprintln!();

    if !result.is_root {
        eprintln!("❌ ERROR: Root privileges required");
        eprintln!("   The installer must run as root to install packages and write under /opt.");
        eprintln!();
        eprintln!("   Solution: Run with sudo or as root user:");
        eprintln!("     sudo flowstack install");
        eprintln!();
    }

    if !result.missing_binaries.is_empty() {
        eprintln!("❌ ERROR: Missing required binaries");
        eprintln!();
        for binary in &result.missing_binaries {
            let package = get_package_for_binary(binary);
            eprintln!("   • {} (install: apt-get install {})", binary, package);
        }
        eprintln!();
    }

    eprintln!("╔══════════════════════════════════════════════════════════════════╗");
    eprintln!("║  Fix the above issues and try again.                             ║");
    eprintln!("╚══════════════════════════════════════════════════════════════════╝");
    eprintln!();

    std::process::exit(1);
}

/// Map binary names to their Ubuntu package names
fn get_package_for_binary(binary: &str) -> &'static str {
    match binary {
        "apt-get" => "apt",
        "curl" => "curl",
        "gpg" => "gnupg",
        "systemctl" => "systemd",
        _ => "unknown", // Fallback for unknown binaries
    }
}

/// Main entry point: verify environment and exit if checks fail
pub fn run_preflight_checks() {
    debug!("Running pre-flight checks...");

    let mut result = verify_environment();

    if should_skip_root_check() {
        warn!("Root check skipped (FLOWSTACK_SKIP_ROOT_CHECK=1)");
        result.is_root = true; // Pretend we're root
    }

    if !result.is_ok() {
        print_error_and_exit(&result);
    }

    info!("Pre-flight checks passed: root={}, all binaries present", result.is_root);
}

// =============================================================================
// Host detection (best-effort, never fatal)
// =============================================================================

/// Extract VERSION_CODENAME from /etc/os-release content.
pub fn codename_from_os_release(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("VERSION_CODENAME="))
        .map(|value| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// Pick the first `inet` address out of `ip -4 -o addr show scope global`.
pub fn first_global_ipv4(output: &str) -> Option<String> {
    for line in output.lines() {
        let mut tokens = line.split_whitespace();
        while let Some(token) = tokens.next() {
            if token == "inet" {
                if let Some(cidr) = tokens.next() {
                    if let Some(addr) = cidr.split('/').next() {
                        if !addr.is_empty() {
                            return Some(addr.to_string());
                        }
                    }
                }
            }
        }
    }
    None
}

/// Normalize a detected timezone string, rejecting empty results.
pub fn normalize_timezone(raw: &str) -> Option<String> {
    let tz = raw.trim();
    if tz.is_empty() { None } else { Some(tz.to_string()) }
}

/// Detect the distribution codename for the Docker apt repository.
///
/// Tries `lsb_release -cs`, then /etc/os-release, then falls back to
/// [`DEFAULT_CODENAME`] with a warning. The fallback is a guess - on a
/// non-matching release the Docker repository entry may point at the wrong
/// suite, which `apt-get update` will surface.
pub fn detect_codename() -> String {
    if let Ok(output) = runner::run("lsb_release", &["-cs"]) {
        if output.success {
            let codename = output.stdout.trim().to_string();
            if !codename.is_empty() {
                debug!("Detected codename via lsb_release: {}", codename);
                return codename;
            }
        }
    }

    if let Ok(content) = fs::read_to_string("/etc/os-release") {
        if let Some(codename) = codename_from_os_release(&content) {
            debug!("Detected codename via /etc/os-release: {}", codename);
            return codename;
        }
    }

    warn!(
        "Could not detect distribution codename, assuming '{}'",
        DEFAULT_CODENAME
    );
    DEFAULT_CODENAME.to_string()
}

/// Detect the first global-scope IPv4 address of this host.
///
/// Falls back to [`FALLBACK_ADDRESS`] with a warning when the probe fails;
/// the generated URLs then only work locally.
pub fn detect_server_ip() -> String {
    if let Ok(output) = runner::run("ip", &["-4", "-o", "addr", "show", "scope", "global"]) {
        if output.success {
            if let Some(addr) = first_global_ipv4(&output.stdout) {
                debug!("Detected server address: {}", addr);
                return addr;
            }
        }
    }

    warn!(
        "Could not detect a global IPv4 address, falling back to '{}'",
        FALLBACK_ADDRESS
    );
    FALLBACK_ADDRESS.to_string()
}

/// Detect the system timezone.
///
/// Tries `timedatectl`, then /etc/timezone, then [`DEFAULT_TIMEZONE`].
pub fn detect_timezone() -> String {
    if let Ok(output) = runner::run("timedatectl", &["show", "-p", "Timezone", "--value"]) {
        if output.success {
            if let Some(tz) = normalize_timezone(&output.stdout) {
                debug!("Detected timezone via timedatectl: {}", tz);
                return tz;
            }
        }
    }

    if let Ok(content) = fs::read_to_string("/etc/timezone") {
        if let Some(tz) = normalize_timezone(&content) {
            debug!("Detected timezone via /etc/timezone: {}", tz);
            return tz;
        }
    }

    warn!("Could not detect timezone, assuming '{}'", DEFAULT_TIMEZONE);
    DEFAULT_TIMEZONE.to_string()
}
