use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::miss_log::DEFAULT_MISS_LOG;

pub const USAGE: &str = "usage: gaswatch <rpc-endpoint>";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(4);
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const BLOCK_CHANNEL_CAPACITY: usize = 100;

#[derive(Debug, Parser)]
#[command(name = "gaswatch", version, about = "Prints gas statistics for every new block")]
pub struct Cli {
    /// JSON-RPC endpoint of the node to watch
    #[arg(value_name = "RPC_ENDPOINT")]
    pub rpc_endpoint: Option<String>,

    /// Check the last transaction of each block for the builder marker and
    /// append misses to failure.logs
    #[arg(long)]
    pub builder_check: bool,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing RPC endpoint")]
    MissingEndpoint,
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub rpc_url: String,
    pub builder_check: bool,
    pub miss_log: PathBuf,
    pub poll_interval: Duration,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
}

impl WatchConfig {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            builder_check: false,
            miss_log: PathBuf::from(DEFAULT_MISS_LOG),
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry_delay: DEFAULT_RETRY_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let rpc_url = cli
            .rpc_endpoint
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::MissingEndpoint)?;

        Ok(Self {
            builder_check: cli.builder_check,
            ..Self::new(rpc_url)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_endpoint() {
        let cli = Cli::parse_from(["gaswatch", "http://localhost:8545"]);
        let config = WatchConfig::from_cli(cli).unwrap();

        assert_eq!(config.rpc_url, "http://localhost:8545");
        assert!(!config.builder_check);
        assert_eq!(config.miss_log, PathBuf::from("failure.logs"));
        assert_eq!(config.retry_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_builder_check_flag() {
        let cli = Cli::parse_from(["gaswatch", "--builder-check", "http://localhost:8545"]);

        assert!(WatchConfig::from_cli(cli).unwrap().builder_check);
    }

    #[test]
    fn test_missing_endpoint() {
        let cli = Cli::parse_from(["gaswatch"]);

        assert_eq!(
            WatchConfig::from_cli(cli).unwrap_err(),
            ConfigError::MissingEndpoint
        );
    }

    #[test]
    fn test_empty_endpoint_is_missing() {
        let cli = Cli::parse_from(["gaswatch", ""]);

        assert!(WatchConfig::from_cli(cli).is_err());
    }
}
