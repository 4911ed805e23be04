//! Docker engine installation from the upstream apt repository.
//!
//! Idempotent sequence: prerequisites, signing key (skipped when already
//! present), repository entry, engine packages, service activation. Two
//! post-install sanity checks gate the rest of the pipeline - a host where
//! `docker --version` or `docker compose version` fails is not usable.

use crate::runner;
use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::path::Path;

/// Upstream signing key location
pub const KEY_URL: &str = "https://download.docker.com/linux/ubuntu/gpg";

/// Dearmored keyring path checked before fetching
pub const KEYRING_PATH: &str = "/etc/apt/keyrings/docker.gpg";

/// apt source list entry written each run
pub const REPO_LIST_PATH: &str = "/etc/apt/sources.list.d/docker.list";

/// Packages required before the repository can be added
pub const PREREQ_PACKAGES: &[&str] = &["ca-certificates", "curl", "gnupg", "lsb-release"];

/// Docker engine, CLI and plugins
pub const ENGINE_PACKAGES: &[&str] = &[
    "docker-ce",
    "docker-ce-cli",
    "containerd.io",
    "docker-buildx-plugin",
    "docker-compose-plugin",
];

/// Render the apt repository entry for the given architecture and codename.
pub fn repo_entry(arch: &str, codename: &str) -> String {
    format!(
        "deb [arch={} signed-by={}] https://download.docker.com/linux/ubuntu {} stable\n",
        arch, KEYRING_PATH, codename
    )
}

fn apt_get(args: &[&str]) -> Result<()> {
    let mut full = vec!["-y"];
    full.extend_from_slice(args);
    runner::run_checked_env("apt-get", &full, &[("DEBIAN_FRONTEND", "noninteractive")])
        .with_context(|| format!("apt-get {} failed", args.join(" ")))?;
    Ok(())
}

fn apt_install(packages: &[&str]) -> Result<()> {
    let mut args = vec!["install"];
    args.extend_from_slice(packages);
    apt_get(&args)
}

/// Fetch and dearmor the upstream signing key unless it is already present.
fn ensure_signing_key() -> Result<()> {
    if Path::new(KEYRING_PATH).exists() {
        info!("Docker signing key already present at {}", KEYRING_PATH);
        return Ok(());
    }

    if runner::is_dry_run() {
        info!("DRY RUN: would fetch {} into {}", KEY_URL, KEYRING_PATH);
        return Ok(());
    }

    fs::create_dir_all("/etc/apt/keyrings").context("Failed to create /etc/apt/keyrings")?;

    let armored = "/etc/apt/keyrings/docker.asc";
    runner::run_checked("curl", &["-fsSL", "-o", armored, KEY_URL])
        .context("Failed to download the Docker signing key")?;
    runner::run_checked("gpg", &["--batch", "--yes", "--dearmor", "-o", KEYRING_PATH, armored])
        .context("Failed to dearmor the Docker signing key")?;
    // The armored copy is only an intermediate
    let _ = fs::remove_file(armored);

    info!("Installed Docker signing key at {}", KEYRING_PATH);
    Ok(())
}

/// Detect the dpkg architecture for the repository entry, defaulting to amd64.
fn dpkg_architecture() -> String {
    runner::run("dpkg", &["--print-architecture"])
        .ok()
        .filter(|output| output.success)
        .map(|output| output.stdout.trim().to_string())
        .filter(|arch| !arch.is_empty())
        .unwrap_or_else(|| "amd64".to_string())
}

/// Write the apt repository entry (overwritten each run).
fn write_repo_entry(codename: &str) -> Result<()> {
    let entry = repo_entry(&dpkg_architecture(), codename);
    if runner::is_dry_run() {
        info!("DRY RUN: would write {}: {}", REPO_LIST_PATH, entry.trim());
        return Ok(());
    }
    fs::write(REPO_LIST_PATH, &entry)
        .with_context(|| format!("Failed to write {}", REPO_LIST_PATH))?;
    info!("Wrote repository entry to {}", REPO_LIST_PATH);
    Ok(())
}

/// Install the Docker engine, CLI and compose plugin, then start the service.
pub fn install_runtime(codename: &str) -> Result<()> {
    apt_get(&["update"])?;
    apt_install(PREREQ_PACKAGES)?;

    ensure_signing_key()?;
    write_repo_entry(codename)?;

    apt_get(&["update"])?;
    apt_install(ENGINE_PACKAGES)?;

    runner::run_checked("systemctl", &["enable", "--now", "docker"])
        .context("Failed to enable the docker service")?;
    Ok(())
}

/// Post-install sanity checks; both must pass or the run aborts.
pub fn verify_runtime() -> Result<()> {
    let version = runner::run("docker", &["--version"])
        .context("docker binary is not available after installation")?;
    if !version.success {
        anyhow::bail!("'docker --version' failed: {}", version.stderr.trim());
    }
    info!("{}", version.stdout.trim());

    let compose = runner::run("docker", &["compose", "version"])
        .context("docker binary is not available after installation")?;
    if !compose.success {
        anyhow::bail!(
            "docker compose plugin is missing: {}",
            compose.stderr.trim()
        );
    }
    info!("{}", compose.stdout.trim());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_entry_format() {
        let entry = repo_entry("amd64", "noble");
        assert_eq!(
            entry,
            "deb [arch=amd64 signed-by=/etc/apt/keyrings/docker.gpg] \
             https://download.docker.com/linux/ubuntu noble stable\n"
        );
    }

    #[test]
    fn test_repo_entry_uses_codename() {
        let entry = repo_entry("arm64", "jammy");
        assert!(entry.contains(" jammy stable"));
        assert!(entry.contains("arch=arm64"));
    }

    #[test]
    fn test_engine_package_set() {
        assert!(ENGINE_PACKAGES.contains(&"docker-ce"));
        assert!(ENGINE_PACKAGES.contains(&"docker-compose-plugin"));
    }
}
