//! Command-line entry point for nimlink.

mod cli;
mod commands;
mod config;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("nimlink=info,warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!(version = env!("CARGO_PKG_VERSION"), "nimlink starting");

    let config = Config::load()?;
    debug!(?config, "configuration");

    match cli.command {
        Command::Convert(args) => commands::convert(&config, args),
        Command::Health(args) => commands::health(&config, args).await,
        Command::Fold(args) => commands::fold(&config, args).await,
        Command::DiffdockRequest(args) => commands::diffdock_request(args),
    }
}
