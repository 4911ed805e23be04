//! Stack materialization: directories, env file, Compose manifest, network.
//!
//! Every artifact here is regenerated wholesale on each run. There is no
//! merge or patch logic - manual edits to the generated files survive only
//! until the installer is re-run.

use crate::compose::{ComposeFile, NetworkDefinition, Service};
use crate::runner;
use crate::settings::{StackLayout, StackSettings};
use anyhow::{Context, Result};
use log::info;
use nix::unistd::{Gid, Uid, chown};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// n8n workflow engine image
pub const N8N_IMAGE: &str = "docker.n8n.io/n8nio/n8n:latest";

/// Open WebUI chat front-end image
pub const WEBUI_IMAGE: &str = "ghcr.io/open-webui/open-webui:main";

/// Container name of the workflow engine service
pub const N8N_CONTAINER: &str = "n8n";

/// Container name of the chat UI service
pub const WEBUI_CONTAINER: &str = "open-webui";

/// Shared virtual network both services attach to
pub const NETWORK_NAME: &str = "flowstack-net";

/// Port Open WebUI listens on inside its container
pub const WEBUI_INTERNAL_PORT: u16 = 8080;

/// UID the n8n container process runs as; its bind-mounted data directory
/// must be writable by this identity.
pub const N8N_UID: u32 = 1000;

/// GID matching [`N8N_UID`]
pub const N8N_GID: u32 = 1000;

/// Render the .env file consumed by the Compose manifest.
///
/// Key order is fixed so re-renders of unchanged settings are byte-identical.
pub fn render_env_file(settings: &StackSettings) -> String {
    let mut out = String::new();
    out.push_str("# Generated by flowstack - re-running the installer overwrites this file.\n");
    for (key, value) in env_entries(settings) {
        out.push_str(&format!("{}={}\n", key, value));
    }
    out
}

/// The recognized environment keys and their rendered values, in file order.
pub fn env_entries(settings: &StackSettings) -> Vec<(&'static str, String)> {
    vec![
        ("GENERIC_TIMEZONE", settings.timezone.clone()),
        ("TZ", settings.timezone.clone()),
        ("N8N_PORT", settings.n8n_port.to_string()),
        ("N8N_BASIC_AUTH_ACTIVE", settings.basic_auth.to_string()),
        ("N8N_HOST", settings.server_ip.clone()),
        ("N8N_PROTOCOL", settings.protocol.to_string()),
        ("N8N_EDITOR_BASE_URL", settings.editor_base_url()),
        ("WEBHOOK_URL", settings.webhook_url()),
        ("N8N_SECURE_COOKIE", settings.secure_cookie.to_string()),
        ("WEBUI_PORT", settings.webui_port.to_string()),
    ]
}

/// Build the typed Compose manifest for the two-service stack.
///
/// Host-side ports resolve through the env file at `docker compose` time;
/// bind-mount host paths are baked in absolute from the layout.
pub fn stack_manifest(layout: &StackLayout) -> ComposeFile {
    let mut services = BTreeMap::new();

    services.insert(
        N8N_CONTAINER.to_string(),
        Service {
            image: N8N_IMAGE.to_string(),
            container_name: N8N_CONTAINER.to_string(),
            restart: "unless-stopped".to_string(),
            env_file: Some(vec![".env".to_string()]),
            environment: None,
            ports: vec!["${N8N_PORT}:5678".to_string()],
            volumes: vec![format!(
                "{}:/home/node/.n8n",
                layout.n8n_data_dir().display()
            )],
            networks: vec![NETWORK_NAME.to_string()],
        },
    );

    services.insert(
        WEBUI_CONTAINER.to_string(),
        Service {
            image: WEBUI_IMAGE.to_string(),
            container_name: WEBUI_CONTAINER.to_string(),
            restart: "unless-stopped".to_string(),
            env_file: None,
            environment: Some(vec!["TZ=${TZ}".to_string()]),
            ports: vec![format!("${{WEBUI_PORT}}:{}", WEBUI_INTERNAL_PORT)],
            volumes: vec![format!(
                "{}:/app/backend/data",
                layout.webui_data_dir().display()
            )],
            networks: vec![NETWORK_NAME.to_string()],
        },
    );

    let mut networks = BTreeMap::new();
    networks.insert(NETWORK_NAME.to_string(), NetworkDefinition { external: true });

    ComposeFile { services, networks }
}

/// Create the persistent directories (idempotent).
pub fn create_data_dirs(layout: &StackLayout) -> Result<()> {
    for dir in [
        layout.base_dir.clone(),
        layout.n8n_data_dir(),
        layout.webui_data_dir(),
    ] {
        if runner::is_dry_run() {
            info!("DRY RUN: would create directory {}", dir.display());
            continue;
        }
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    Ok(())
}

/// Force ownership of the n8n data directory to the container identity.
pub fn force_data_dir_ownership(layout: &StackLayout) -> Result<()> {
    let dir = layout.n8n_data_dir();
    if runner::is_dry_run() {
        info!(
            "DRY RUN: would chown {} to {}:{}",
            dir.display(),
            N8N_UID,
            N8N_GID
        );
        return Ok(());
    }
    chown(
        &dir,
        Some(Uid::from_raw(N8N_UID)),
        Some(Gid::from_raw(N8N_GID)),
    )
    .with_context(|| format!("Failed to chown {} to {}:{}", dir.display(), N8N_UID, N8N_GID))?;
    Ok(())
}

/// Write a generated file, replacing any previous content.
fn write_generated(path: &Path, content: &str) -> Result<()> {
    if runner::is_dry_run() {
        info!("DRY RUN: would write {}", path.display());
        return Ok(());
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(())
}

/// Create the shared network unless it already exists (idempotent).
pub fn ensure_network() -> Result<()> {
    let probe = runner::run("docker", &["network", "inspect", NETWORK_NAME])?;
    if probe.success {
        info!("Network '{}' already exists", NETWORK_NAME);
        return Ok(());
    }
    runner::run_checked("docker", &["network", "create", NETWORK_NAME])
        .with_context(|| format!("Failed to create network '{}'", NETWORK_NAME))?;
    info!("Created network '{}'", NETWORK_NAME);
    Ok(())
}

/// Materialize the whole stack: directories, ownership, env file, manifest,
/// network. Each sub-step is idempotent; generated files are overwritten.
pub fn materialize(layout: &StackLayout, settings: &StackSettings) -> Result<()> {
    create_data_dirs(layout)?;
    force_data_dir_ownership(layout)?;

    write_generated(&layout.env_file(), &render_env_file(settings))?;

    let manifest = stack_manifest(layout)
        .to_yaml()
        .context("Failed to serialize Compose manifest")?;
    write_generated(&layout.manifest_file(), &manifest)?;

    ensure_network()?;
    Ok(())
}
