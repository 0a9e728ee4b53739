use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::error;

pub const DEFAULT_MISS_LOG: &str = "failure.logs";

/// One block the expected builder did not produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissRecord {
    pub timestamp: DateTime<Utc>,
    pub block_number: u64,
    pub gas_used: String,
    pub num_txs: usize,
}

impl MissRecord {
    pub fn now(block_number: u64, gas_used: String, num_txs: usize) -> Self {
        Self {
            timestamp: Utc::now(),
            block_number,
            gas_used,
            num_txs,
        }
    }
}

impl fmt::Display for MissRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {{ blockNumber: {}, gasUsed: \"{}%\", numTxs: {} }}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.block_number,
            self.gas_used,
            self.num_txs
        )
    }
}

#[derive(Debug, Clone)]
pub struct MissLogger {
    path: PathBuf,
}

impl Default for MissLogger {
    fn default() -> Self {
        Self::new(DEFAULT_MISS_LOG)
    }
}

impl MissLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `record` as one line. Each call opens and closes the file.
    pub async fn append(&self, record: &MissRecord) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(format!("{}\n", record).as_bytes()).await?;
        file.flush().await
    }

    /// Like [`MissLogger::append`], but failures are only logged.
    pub async fn record(&self, record: &MissRecord) -> bool {
        match self.append(record).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    block = record.block_number,
                    path = %self.path.display(),
                    "Error writing to log file: {}",
                    e
                );
                false
            }
        }
    }
}
