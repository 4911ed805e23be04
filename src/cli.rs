use clap::{Parser, Subcommand};

/// FlowStack - provision a host with an n8n + Open WebUI container stack
#[derive(Parser)]
#[command(name = "flowstack")]
#[command(about = "Installs Docker and a self-hosted n8n + Open WebUI stack on Ubuntu")]
#[command(version)]
pub struct Cli {
    /// Dry-run mode: show what would be executed without making changes.
    ///
    /// In this mode, mutating operations (package installs, file writes,
    /// docker invocations) are skipped and logged. Detection probes still
    /// execute so the preview is realistic.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full install pipeline (the default when no command is given)
    Install,
    /// Run preflight checks and print detected host values without installing
    Check,
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_no_args() {
        // Running with no args should succeed (defaults to install)
        let result = Cli::try_parse_from(["flowstack"]);
        assert!(result.is_ok());
        let cli = result.unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_cli_install_command() {
        let result = Cli::try_parse_from(["flowstack", "install"]);
        assert!(result.is_ok());
        assert!(matches!(result.unwrap().command, Some(Commands::Install)));
    }

    #[test]
    fn test_cli_check_command() {
        let result = Cli::try_parse_from(["flowstack", "check"]);
        assert!(result.is_ok());
        assert!(matches!(result.unwrap().command, Some(Commands::Check)));
    }

    #[test]
    fn test_cli_global_dry_run() {
        let cli = Cli::try_parse_from(["flowstack", "install", "--dry-run"]).unwrap();
        assert!(cli.dry_run);

        let cli = Cli::try_parse_from(["flowstack", "--dry-run"]).unwrap();
        assert!(cli.dry_run);
    }

    #[test]
    fn test_cli_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["flowstack", "uninstall"]).is_err());
    }
}
