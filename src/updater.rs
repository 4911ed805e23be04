//! Generation of the standalone updater script.
//!
//! The installer emits a self-contained shell script the operator runs
//! manually (or from a scheduler) to refresh the stack in place: re-pull
//! images, recreate containers, prune dangling images, optionally reboot.
//! No state migration, no version pinning, no rollback.

use crate::runner;
use crate::settings::StackLayout;
use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::os::unix::fs::PermissionsExt;

/// Render the updater script for the given layout.
pub fn render_update_script(layout: &StackLayout) -> String {
    format!(
        r#"#!/usr/bin/env bash
# flowstack-update - refresh the FlowStack container stack in place.
# Generated by flowstack; re-running the installer overwrites this file.
set -euo pipefail

COMPOSE_FILE="{manifest}"
ENV_FILE="{env_file}"

if ! command -v docker >/dev/null 2>&1; then
    echo "ERROR: docker is not installed" >&2
    exit 1
fi
if ! docker compose version >/dev/null 2>&1; then
    echo "ERROR: the docker compose plugin is not installed" >&2
    exit 1
fi

echo "Pulling latest images..."
docker compose -f "$COMPOSE_FILE" --env-file "$ENV_FILE" pull

echo "Recreating containers..."
docker compose -f "$COMPOSE_FILE" --env-file "$ENV_FILE" up -d --force-recreate

echo "Pruning dangling images..."
docker image prune -f

read -r -p "Reboot now? [y/N] " answer
case "$answer" in
    [yY]*) reboot ;;
    *) echo "Update complete. Reboot skipped." ;;
esac
"#,
        manifest = layout.manifest_file().display(),
        env_file = layout.env_file().display(),
    )
}

/// Write the updater script to its fixed path with mode 0755.
pub fn write_update_script(layout: &StackLayout) -> Result<()> {
    let path = &layout.updater_script;

    if runner::is_dry_run() {
        info!("DRY RUN: would write updater script to {}", path.display());
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    fs::write(path, render_update_script(layout))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("Failed to set permissions on {}", path.display()))?;

    info!("Wrote updater script to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_has_interpreter_and_fail_fast() {
        let script = render_update_script(&StackLayout::default());
        assert!(script.starts_with("#!/usr/bin/env bash"));
        assert!(script.contains("set -euo pipefail"));
    }

    #[test]
    fn test_script_guards_runtime_presence() {
        let script = render_update_script(&StackLayout::default());
        assert!(script.contains("command -v docker"));
        assert!(script.contains("docker compose version"));
    }

    #[test]
    fn test_script_update_sequence() {
        let script = render_update_script(&StackLayout::default());
        let pull = script.find("pull").expect("pull step");
        let recreate = script.find("--force-recreate").expect("recreate step");
        let prune = script.find("docker image prune -f").expect("prune step");
        assert!(pull < recreate && recreate < prune, "steps must run in order");
    }

    #[test]
    fn test_script_reboot_prompt_defaults_to_no() {
        let script = render_update_script(&StackLayout::default());
        assert!(script.contains("Reboot now? [y/N]"));
        assert!(script.contains("Reboot skipped"));
    }

    #[test]
    fn test_script_uses_layout_paths() {
        let script = render_update_script(&StackLayout::default());
        assert!(script.contains("COMPOSE_FILE=\"/opt/flowstack/docker-compose.yml\""));
        assert!(script.contains("ENV_FILE=\"/opt/flowstack/.env\""));
    }
}
