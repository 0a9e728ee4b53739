use std::process::ExitCode;

use clap::Parser;
use gaswatch::config::{Cli, WatchConfig, USAGE};
use gaswatch::monitor;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match WatchConfig::from_cli(Cli::parse()) {
        Ok(config) => config,
        Err(_) => {
            eprintln!("{}", USAGE);
            return ExitCode::from(1);
        }
    };

    match monitor::watch(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(1)
        }
    }
}
