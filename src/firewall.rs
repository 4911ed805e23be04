//! Firewall extension for an already-active ufw.
//!
//! The installer never enables a firewall. If ufw is absent or inactive the
//! step is skipped with a warning; if active, the two published ports are
//! opened best-effort (a failed rule does not abort the run).

use crate::preflight::binary_exists;
use crate::runner;
use crate::settings::StackSettings;
use log::{info, warn};
use strum::Display;

/// Observed state of the host firewall
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum FirewallState {
    Active,
    Inactive,
    Missing,
}

/// Classify `ufw status` stdout.
pub fn parse_ufw_state(status_output: &str) -> FirewallState {
    if status_output.contains("Status: active") {
        FirewallState::Active
    } else {
        FirewallState::Inactive
    }
}

/// Probe whether ufw exists and is active.
pub fn probe_firewall() -> FirewallState {
    if !binary_exists("ufw") {
        return FirewallState::Missing;
    }
    match runner::run("ufw", &["status"]) {
        Ok(output) if output.success => parse_ufw_state(&output.stdout),
        _ => FirewallState::Inactive,
    }
}

/// Open the stack's published ports on an active firewall.
pub fn open_ports(settings: &StackSettings) {
    match probe_firewall() {
        FirewallState::Missing => {
            warn!("ufw is not installed - skipping firewall configuration");
        }
        FirewallState::Inactive => {
            warn!("ufw is inactive - skipping firewall configuration (the installer never enables a firewall)");
        }
        FirewallState::Active => {
            for port in [settings.n8n_port, settings.webui_port] {
                let rule = format!("{}/tcp", port);
                if runner::run_tolerant("ufw", &["allow", &rule]) {
                    info!("Opened {}", rule);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_active() {
        let output = "Status: active\n\nTo                         Action      From\n";
        assert_eq!(parse_ufw_state(output), FirewallState::Active);
    }

    #[test]
    fn test_parse_inactive() {
        assert_eq!(parse_ufw_state("Status: inactive\n"), FirewallState::Inactive);
        assert_eq!(parse_ufw_state(""), FirewallState::Inactive);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(FirewallState::Active.to_string(), "active");
        assert_eq!(FirewallState::Missing.to_string(), "missing");
    }
}
