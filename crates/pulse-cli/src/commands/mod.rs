//! CLI commands.

use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod notify;
pub mod serve;

pub use notify::NotifyArgs;
pub use serve::ServeArgs;

#[derive(Parser)]
#[command(name = "pulse", version, about = "Pulse notification server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the notification server
    Serve(ServeArgs),
    /// Send an event to a running server
    Notify(NotifyArgs),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Serve(args) => serve::execute(args).await,
            Commands::Notify(args) => notify::execute(args).await,
        }
    }
}
