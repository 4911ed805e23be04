//! FlowStack - Main entry point
//!
//! A single linear pipeline that provisions a fresh Ubuntu host with the
//! n8n + Open WebUI container stack.

use log::{error, info};

use flowstack::cli::{Cli, Commands};
use flowstack::settings::{StackLayout, StackSettings};
use flowstack::{docker, firewall, launcher, preflight, runner, stack, updater};

/// Initialize the logger with appropriate settings
fn init_logger() {
    use env_logger::Builder;
    use std::io::Write;

    Builder::from_default_env()
        .format(|buf, record| {
            writeln!(buf, "[{}] {}", record.level(), record.args())
        })
        .filter_level(log::LevelFilter::Info)
        .parse_default_env() // Allows RUST_LOG env var to override
        .init();
}

/// Main application entry point
fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    info!("FlowStack installer starting up");

    let cli = Cli::parse_args();

    if cli.dry_run {
        runner::enable_dry_run();
    }

    match cli.command {
        Some(Commands::Check) => run_check(),
        Some(Commands::Install) | None => run_install(),
    }
}

/// Preflight and detection report without touching the host
fn run_check() -> Result<(), Box<dyn std::error::Error>> {
    preflight::run_preflight_checks();

    let settings = StackSettings::detect();
    let codename = preflight::detect_codename();

    println!("✓ Preflight checks passed");
    println!();
    println!("Detected host values:");
    println!("  Codename:  {}", codename);
    println!("  Address:   {}", settings.server_ip);
    println!("  Timezone:  {}", settings.timezone);
    println!("  Firewall:  {}", firewall::probe_firewall());
    println!();
    println!("  n8n URL:        {}", settings.editor_base_url());
    println!("  Open WebUI URL: {}", settings.webui_url());
    Ok(())
}

/// Run the full install pipeline, aborting on the first hard failure
fn run_install() -> Result<(), Box<dyn std::error::Error>> {
    preflight::run_preflight_checks();

    let settings = StackSettings::detect();
    if let Err(e) = settings.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        std::process::exit(1);
    }
    let layout = StackLayout::default();
    let codename = preflight::detect_codename();

    println!("🔧 Installing the Docker engine...");
    docker::install_runtime(&codename)?;
    docker::verify_runtime()?;
    println!("✓ Docker engine ready");

    println!("🔧 Materializing the stack configuration...");
    stack::materialize(&layout, &settings)?;
    println!("✓ Stack configuration written to {}", layout.base_dir.display());

    println!("🔧 Configuring the firewall...");
    firewall::open_ports(&settings);

    println!("🚀 Launching the stack...");
    if let Err(e) = launcher::launch(&layout) {
        error!("Stack launch failed: {}", e);
        eprintln!("✗ {}", e);
        std::process::exit(1);
    }
    println!("✓ Both services are running");

    updater::write_update_script(&layout)?;

    print_summary(&settings, &layout);
    Ok(())
}

/// Final human-readable summary block
fn print_summary(settings: &StackSettings, layout: &StackLayout) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║                 FlowStack installation complete                  ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();
    println!("  n8n:         {}", settings.editor_base_url());
    println!("  Open WebUI:  {}", settings.webui_url());
    println!();
    println!("  Data:        {}", layout.n8n_data_dir().display());
    println!("               {}", layout.webui_data_dir().display());
    println!("  Env file:    {}", layout.env_file().display());
    println!("  Manifest:    {}", layout.manifest_file().display());
    println!("  Updater:     {}", layout.updater_script.display());
    println!();
    println!("  Run '{}' to refresh the stack.", layout.updater_script.display());
    println!();
}
