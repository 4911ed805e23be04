//! Stack settings and host filesystem layout.
//!
//! This module replaces the original stringly-assembled configuration with a
//! typed settings struct that is the single source of truth for everything
//! rendered to disk (.env file, Compose manifest, updater script). Settings
//! are detected once per run and written out wholesale - a re-run clobbers
//! any manual edits to the generated files.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strum::{Display, EnumIter, EnumString};

use crate::preflight;

/// Default published port for the n8n editor/webhook endpoint
pub const DEFAULT_N8N_PORT: u16 = 5678;

/// Default published port for the Open WebUI front-end
pub const DEFAULT_WEBUI_PORT: u16 = 3000;

/// Default base directory for persistent stack state
pub const DEFAULT_BASE_DIR: &str = "/opt/flowstack";

/// Fixed path the generated updater script is written to
pub const DEFAULT_UPDATER_PATH: &str = "/usr/local/bin/flowstack-update";

/// Environment variable forcing the detected server address
pub const ENV_SERVER_IP: &str = "FLOWSTACK_SERVER_IP";

/// Environment variable forcing the detected timezone
pub const ENV_TIMEZONE: &str = "FLOWSTACK_TIMEZONE";

/// URL scheme the stack is reachable under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Protocol {
    #[default]
    #[strum(serialize = "http")]
    Http,
    #[strum(serialize = "https")]
    Https,
}

/// Optional overrides read from the process environment.
///
/// Split out from detection so override application is testable without
/// mutating the process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub server_ip: Option<String>,
    pub timezone: Option<String>,
}

impl EnvOverrides {
    /// Read the recognized FLOWSTACK_* override variables.
    pub fn from_env() -> Self {
        let non_empty = |v: std::result::Result<String, std::env::VarError>| {
            v.ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        Self {
            server_ip: non_empty(std::env::var(ENV_SERVER_IP)),
            timezone: non_empty(std::env::var(ENV_TIMEZONE)),
        }
    }
}

/// Everything the generated stack configuration depends on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StackSettings {
    /// Address the services are published under (detected or overridden)
    pub server_ip: String,
    /// IANA timezone passed into both containers
    pub timezone: String,
    /// Scheme used in the generated n8n URLs
    pub protocol: Protocol,
    /// Published n8n port
    pub n8n_port: u16,
    /// Published Open WebUI port (container listens on 8080)
    pub webui_port: u16,
    /// Whether n8n basic auth is advertised in the env file
    pub basic_auth: bool,
    /// Whether n8n should require secure cookies (https-only deployments)
    pub secure_cookie: bool,
}

impl Default for StackSettings {
    fn default() -> Self {
        Self {
            server_ip: preflight::FALLBACK_ADDRESS.to_string(),
            timezone: preflight::DEFAULT_TIMEZONE.to_string(),
            protocol: Protocol::Http,
            n8n_port: DEFAULT_N8N_PORT,
            webui_port: DEFAULT_WEBUI_PORT,
            basic_auth: false,
            secure_cookie: false,
        }
    }
}

impl StackSettings {
    /// Detect settings from the running host, applying environment overrides.
    ///
    /// Detection is best-effort and never fails; each probe substitutes its
    /// documented default when the underlying tool is missing or silent.
    pub fn detect() -> Self {
        let mut settings = Self {
            server_ip: preflight::detect_server_ip(),
            timezone: preflight::detect_timezone(),
            ..Self::default()
        };
        settings.apply_overrides(&EnvOverrides::from_env());
        settings
    }

    /// Apply explicit overrides on top of detected values.
    pub fn apply_overrides(&mut self, overrides: &EnvOverrides) {
        if let Some(ip) = &overrides.server_ip {
            log::info!("Server address forced via {}: {}", ENV_SERVER_IP, ip);
            self.server_ip = ip.clone();
        }
        if let Some(tz) = &overrides.timezone {
            log::info!("Timezone forced via {}: {}", ENV_TIMEZONE, tz);
            self.timezone = tz.clone();
        }
    }

    /// Validate the settings before anything is rendered to disk.
    pub fn validate(&self) -> Result<()> {
        if self.server_ip.trim().is_empty() {
            anyhow::bail!("Server address must not be empty");
        }
        if self.server_ip.contains(char::is_whitespace) {
            anyhow::bail!("Server address must not contain whitespace");
        }
        if self.timezone.trim().is_empty() {
            anyhow::bail!("Timezone must not be empty");
        }
        if self.n8n_port == 0 || self.webui_port == 0 {
            anyhow::bail!("Published ports must be non-zero");
        }
        if self.n8n_port == self.webui_port {
            anyhow::bail!(
                "n8n and Open WebUI cannot share published port {}",
                self.n8n_port
            );
        }
        Ok(())
    }

    /// Base URL the n8n editor is reachable under
    pub fn editor_base_url(&self) -> String {
        format!("{}://{}:{}/", self.protocol, self.server_ip, self.n8n_port)
    }

    /// URL n8n advertises for incoming webhooks (same endpoint as the editor)
    pub fn webhook_url(&self) -> String {
        self.editor_base_url()
    }

    /// URL the Open WebUI front-end is reachable under
    pub fn webui_url(&self) -> String {
        format!("{}://{}:{}/", self.protocol, self.server_ip, self.webui_port)
    }
}

/// Host filesystem layout of the generated stack.
///
/// All paths derive from `base_dir` so tests can rebase the whole layout
/// onto a temporary directory.
#[derive(Debug, Clone, PartialEq)]
pub struct StackLayout {
    pub base_dir: PathBuf,
    pub updater_script: PathBuf,
}

impl Default for StackLayout {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            updater_script: PathBuf::from(DEFAULT_UPDATER_PATH),
        }
    }
}

impl StackLayout {
    /// Rebase the layout under an arbitrary root (test fixtures).
    pub fn rooted(root: &Path) -> Self {
        Self {
            base_dir: root.join("flowstack"),
            updater_script: root.join("bin").join("flowstack-update"),
        }
    }

    /// Persistent n8n data directory (bind-mounted, owned by the container user)
    pub fn n8n_data_dir(&self) -> PathBuf {
        self.base_dir.join("n8n")
    }

    /// Persistent Open WebUI data directory (bind-mounted)
    pub fn webui_data_dir(&self) -> PathBuf {
        self.base_dir.join("openwebui")
    }

    /// Generated environment file consumed by the Compose manifest
    pub fn env_file(&self) -> PathBuf {
        self.base_dir.join(".env")
    }

    /// Generated Compose manifest
    pub fn manifest_file(&self) -> PathBuf {
        self.base_dir.join("docker-compose.yml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = StackSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.n8n_port, 5678);
        assert_eq!(settings.webui_port, 3000);
        assert_eq!(settings.protocol, Protocol::Http);
    }

    #[test]
    fn test_validation_rejects_port_collision() {
        let settings = StackSettings {
            webui_port: 5678,
            ..StackSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_port() {
        let settings = StackSettings {
            n8n_port: 0,
            ..StackSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_address() {
        let settings = StackSettings {
            server_ip: "   ".to_string(),
            ..StackSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_url_accessors() {
        let settings = StackSettings {
            server_ip: "203.0.113.7".to_string(),
            ..StackSettings::default()
        };
        assert_eq!(settings.editor_base_url(), "http://203.0.113.7:5678/");
        assert_eq!(settings.webhook_url(), settings.editor_base_url());
        assert_eq!(settings.webui_url(), "http://203.0.113.7:3000/");
    }

    #[test]
    fn test_apply_overrides() {
        let mut settings = StackSettings::default();
        settings.apply_overrides(&EnvOverrides {
            server_ip: Some("198.51.100.4".to_string()),
            timezone: Some("Europe/Berlin".to_string()),
        });
        assert_eq!(settings.server_ip, "198.51.100.4");
        assert_eq!(settings.timezone, "Europe/Berlin");

        // Empty overrides leave detected values alone
        let before = settings.clone();
        settings.apply_overrides(&EnvOverrides::default());
        assert_eq!(settings, before);
    }

    #[test]
    fn test_layout_defaults() {
        let layout = StackLayout::default();
        assert_eq!(layout.env_file(), PathBuf::from("/opt/flowstack/.env"));
        assert_eq!(
            layout.manifest_file(),
            PathBuf::from("/opt/flowstack/docker-compose.yml")
        );
        assert_eq!(layout.updater_script, PathBuf::from(DEFAULT_UPDATER_PATH));
    }

    #[test]
    fn test_layout_rebases_under_root() {
        let layout = StackLayout::rooted(Path::new("/tmp/fixture"));
        assert_eq!(layout.n8n_data_dir(), PathBuf::from("/tmp/fixture/flowstack/n8n"));
        assert_eq!(
            layout.updater_script,
            PathBuf::from("/tmp/fixture/bin/flowstack-update")
        );
    }
}
