//! Server command.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use pulse_core::config::PulseConfig;

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on (overrides config)
    #[arg(long)]
    pub port: Option<u16>,

    /// Host to bind to (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Path to a TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

pub async fn execute(args: ServeArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => PulseConfig::load(path)?,
        None => PulseConfig::default(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(host) = args.host {
        config.host = host;
    }

    println!();
    println!("  {} {}", "Pulse".cyan().bold(), "Notification Server".bold());
    println!();
    println!(
        "  {}  ws://{}:{}/ws",
        "Push".green(),
        config.host,
        config.port
    );
    println!(
        "  {}   http://{}:{}/api",
        "API".green(),
        config.host,
        config.port
    );
    println!(
        "  {} http://{}:{}/internal/events",
        "Ingest".green(),
        config.host,
        config.port
    );
    println!();
    println!("  {}", "Ctrl+C to stop".dimmed());
    println!();

    pulse_web::run_server(&config).await?;

    Ok(())
}
