//! Docker Compose manifest model.
//!
//! Typed representation of the small slice of the Compose specification the
//! generated stack uses. The manifest is produced by serializing this model
//! with serde_yaml instead of concatenating strings, which keeps quoting and
//! indentation out of the installer's hands.
//!
//! BTreeMap keeps serialization order deterministic, so re-renders of an
//! unchanged configuration are byte-identical.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root structure of the generated docker-compose.yml.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeFile {
    /// Services to be created
    pub services: BTreeMap<String, Service>,

    /// Networks referenced by the services
    pub networks: BTreeMap<String, NetworkDefinition>,
}

/// A service entry in the generated manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    /// Container image to use
    pub image: String,

    /// Fixed container name (the launcher verifies state by this name)
    pub container_name: String,

    /// Restart policy enforced by the runtime supervisor
    pub restart: String,

    /// Environment files loaded into the container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_file: Option<Vec<String>>,

    /// Inline environment variables (KEY=value form)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Vec<String>>,

    /// Port mappings, host side resolved through the env file
    pub ports: Vec<String>,

    /// Bind mounts for persistent state
    pub volumes: Vec<String>,

    /// Networks to connect to
    pub networks: Vec<String>,
}

/// A network reference in the generated manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkDefinition {
    /// The network is created by the installer, not by compose
    pub external: bool,
}

impl ComposeFile {
    /// Serialize the manifest to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Parse a manifest back from YAML (used by tests and sanity checks).
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ComposeFile {
        let mut services = BTreeMap::new();
        services.insert(
            "web".to_string(),
            Service {
                image: "nginx:alpine".to_string(),
                container_name: "web".to_string(),
                restart: "unless-stopped".to_string(),
                env_file: Some(vec![".env".to_string()]),
                environment: None,
                ports: vec!["${PORT}:80".to_string()],
                volumes: vec!["/opt/web:/usr/share/nginx/html".to_string()],
                networks: vec!["frontend".to_string()],
            },
        );
        let mut networks = BTreeMap::new();
        networks.insert("frontend".to_string(), NetworkDefinition { external: true });
        ComposeFile { services, networks }
    }

    #[test]
    fn test_yaml_roundtrip() {
        let manifest = sample();
        let yaml = manifest.to_yaml().expect("serialize");
        let parsed = ComposeFile::from_yaml(&yaml).expect("parse back");
        assert_eq!(manifest, parsed);
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let manifest = sample();
        let yaml = manifest.to_yaml().expect("serialize");
        assert!(yaml.contains("env_file"));
        assert!(!yaml.contains("environment"), "unset fields must not appear: {}", yaml);
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let manifest = sample();
        let a = manifest.to_yaml().expect("serialize");
        let b = manifest.to_yaml().expect("serialize");
        assert_eq!(a, b);
    }
}
