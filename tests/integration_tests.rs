//! Integration Tests for the FlowStack installer
//!
//! These tests verify:
//! - Wholesale regeneration of the env file and Compose manifest
//! - Idempotent directory creation
//! - Generated manifest structure (parse-back through serde_yaml)
//! - Updater script content and permissions

use flowstack::compose::ComposeFile;
use flowstack::settings::{StackLayout, StackSettings};
use flowstack::{stack, updater};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

fn fixture_layout(root: &Path) -> StackLayout {
    let layout = StackLayout::rooted(root);
    fs::create_dir_all(&layout.base_dir).expect("create base dir");
    layout
}

// =============================================================================
// Env File Regeneration Tests
// =============================================================================

#[test]
fn test_env_file_is_regenerated_wholesale() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let layout = fixture_layout(tmp.path());
    let settings = StackSettings::default();

    // Pre-seed the env file with a manual customization
    fs::write(layout.env_file(), "N8N_PORT=9999\nCUSTOM_KEY=operator-added\n")
        .expect("pre-seed env file");

    // A re-render clobbers it with the computed defaults
    fs::write(layout.env_file(), stack::render_env_file(&settings)).expect("re-render");

    let content = fs::read_to_string(layout.env_file()).expect("read back");
    assert!(content.contains("N8N_PORT=5678"), "default port must win: {}", content);
    assert!(!content.contains("CUSTOM_KEY"), "manual keys must not survive: {}", content);
    assert!(!content.contains("9999"));
}

#[test]
fn test_env_file_keys_appear_exactly_once() {
    let rendered = stack::render_env_file(&StackSettings::default());
    for (key, _) in stack::env_entries(&StackSettings::default()) {
        let needle = format!("{}=", key);
        let count = rendered
            .lines()
            .filter(|line| line.starts_with(&needle))
            .count();
        assert_eq!(count, 1, "key {} should appear exactly once", key);
    }
}

// =============================================================================
// Compose Manifest Tests
// =============================================================================

#[test]
fn test_manifest_parses_back_with_expected_structure() {
    let layout = StackLayout::default();
    let yaml = stack::stack_manifest(&layout).to_yaml().expect("serialize");
    let parsed = ComposeFile::from_yaml(&yaml).expect("parse back");

    assert_eq!(parsed.services.len(), 2);
    let n8n = parsed.services.get("n8n").expect("n8n service");
    let webui = parsed.services.get("open-webui").expect("webui service");

    for service in [n8n, webui] {
        assert_eq!(service.restart, "unless-stopped");
        assert_eq!(service.networks, vec!["flowstack-net".to_string()]);
        assert_eq!(service.ports.len(), 1);
        assert_eq!(service.volumes.len(), 1);
    }

    let network = parsed.networks.get("flowstack-net").expect("network");
    assert!(network.external);
}

#[test]
fn test_manifest_is_regenerated_wholesale() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let layout = fixture_layout(tmp.path());

    fs::write(layout.manifest_file(), "services: {legacy: {image: old}}\n")
        .expect("pre-seed manifest");

    let yaml = stack::stack_manifest(&layout).to_yaml().expect("serialize");
    fs::write(layout.manifest_file(), &yaml).expect("re-render");

    let content = fs::read_to_string(layout.manifest_file()).expect("read back");
    assert!(!content.contains("legacy"));
    assert!(content.contains("open-webui"));
}

#[test]
fn test_manifest_bind_mounts_follow_layout() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let layout = StackLayout::rooted(tmp.path());
    let manifest = stack::stack_manifest(&layout);

    let n8n_volume = &manifest.services["n8n"].volumes[0];
    assert!(n8n_volume.starts_with(layout.n8n_data_dir().to_str().unwrap()));
    assert!(n8n_volume.ends_with(":/home/node/.n8n"));
}

// =============================================================================
// Directory Creation Tests
// =============================================================================

#[test]
fn test_data_dir_creation_is_idempotent() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let layout = StackLayout::rooted(tmp.path());

    stack::create_data_dirs(&layout).expect("first run");
    stack::create_data_dirs(&layout).expect("second run");

    assert!(layout.n8n_data_dir().is_dir());
    assert!(layout.webui_data_dir().is_dir());
}

// =============================================================================
// Updater Script Tests
// =============================================================================

#[test]
fn test_updater_script_is_written_executable() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let layout = StackLayout::rooted(tmp.path());

    updater::write_update_script(&layout).expect("write updater");

    let metadata = fs::metadata(&layout.updater_script).expect("stat updater");
    assert_eq!(metadata.permissions().mode() & 0o777, 0o755);

    let content = fs::read_to_string(&layout.updater_script).expect("read updater");
    assert!(content.starts_with("#!/usr/bin/env bash"));
    assert!(content.contains("docker image prune -f"));
}

#[test]
fn test_updater_script_paths_match_layout() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let layout = StackLayout::rooted(tmp.path());

    let script = updater::render_update_script(&layout);
    assert!(script.contains(layout.manifest_file().to_str().unwrap()));
    assert!(script.contains(layout.env_file().to_str().unwrap()));
}
