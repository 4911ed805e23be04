//! Stack launch and running-state verification.
//!
//! Pulls both images, starts the services detached, waits a fixed settle
//! delay, then verifies each expected container through the runtime's
//! structured state (`docker inspect`) instead of grepping `docker ps` text.
//! No retry, no backoff - a service that is not running fails the run.

use crate::error::{InstallError, Result};
use crate::runner;
use crate::settings::StackLayout;
use crate::stack::{N8N_CONTAINER, WEBUI_CONTAINER};
use log::info;
use serde::Deserialize;
use std::time::Duration;

/// Fixed delay between `up -d` and the running-state check
pub const STARTUP_SETTLE: Duration = Duration::from_secs(10);

/// The slice of `docker inspect .State` the launcher cares about.
#[derive(Debug, Deserialize)]
pub struct ContainerState {
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Running")]
    pub running: bool,
}

impl ContainerState {
    /// Parse the JSON emitted by `docker inspect --format '{{json .State}}'`.
    pub fn from_inspect_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json.trim())?)
    }
}

fn compose(layout: &StackLayout, args: &[&str]) -> Result<runner::CmdOutput> {
    let manifest = layout.manifest_file();
    let env_file = layout.env_file();
    let mut full = vec![
        "compose",
        "-f",
        manifest.to_str().unwrap_or_default(),
        "--env-file",
        env_file.to_str().unwrap_or_default(),
    ];
    full.extend_from_slice(args);
    runner::run_checked("docker", &full)
}

/// Verify one expected container reports a running state.
fn verify_running(name: &str) -> Result<()> {
    if runner::is_dry_run() {
        info!("DRY RUN: would verify container '{}' is running", name);
        return Ok(());
    }

    let inspect = runner::run("docker", &["inspect", "--format", "{{json .State}}", name])?;
    if !inspect.success {
        return Err(InstallError::launch(format!(
            "service '{}' was not created: {}",
            name,
            inspect.stderr.trim()
        )));
    }

    let state = ContainerState::from_inspect_json(&inspect.stdout)?;
    if !state.running {
        return Err(InstallError::launch(format!(
            "service '{}' is not running (state: {})",
            name, state.status
        )));
    }

    info!("Service '{}' is running", name);
    Ok(())
}

/// Pull images, start the stack detached and verify both services run.
pub fn launch(layout: &StackLayout) -> Result<()> {
    info!("Pulling images...");
    compose(layout, &["pull"])?;

    info!("Starting services...");
    compose(layout, &["up", "-d"])?;

    if !runner::is_dry_run() {
        info!(
            "Waiting {}s for the services to settle...",
            STARTUP_SETTLE.as_secs()
        );
        std::thread::sleep(STARTUP_SETTLE);
    }

    verify_running(N8N_CONTAINER)?;
    verify_running(WEBUI_CONTAINER)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_running_state() {
        let json = r#"{"Status":"running","Running":true,"Paused":false,"Pid":4242}"#;
        let state = ContainerState::from_inspect_json(json).expect("parse");
        assert!(state.running);
        assert_eq!(state.status, "running");
    }

    #[test]
    fn test_parse_exited_state() {
        let json = r#"{"Status":"exited","Running":false,"ExitCode":1}"#;
        let state = ContainerState::from_inspect_json(json).expect("parse");
        assert!(!state.running);
        assert_eq!(state.status, "exited");
    }

    #[test]
    fn test_parse_garbage_is_an_error() {
        assert!(ContainerState::from_inspect_json("not json").is_err());
    }
}
