use std::io::Write;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::builder::{BuilderCheck, BuilderVerdict};
use crate::config::{WatchConfig, BLOCK_CHANNEL_CAPACITY};
use crate::fetcher::BlockFetcher;
use crate::miss_log::{MissLogger, MissRecord};
use crate::report::{gas_used_percentage, ReportError, Reporter};
use crate::rpc::RpcClient;
use crate::transport::http::TransportBuilder;
use crate::watcher::BlockListener;
use crate::RpcError;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("block listener stopped: {0}")]
    ListenerStopped(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockOutcome {
    pub height: u64,
    /// `None` when no check ran: checking disabled or an empty block.
    pub builder: Option<BuilderVerdict>,
}

/// Handles block events: fetch, print, and optionally check the builder.
///
/// Events are independent of each other; nothing is remembered between them.
#[derive(Debug)]
pub struct Monitor<W> {
    fetcher: BlockFetcher,
    reporter: Reporter<W>,
    builder: Option<(BuilderCheck, MissLogger)>,
}

impl<W: Write + Send + 'static> Monitor<W> {
    pub fn new(fetcher: BlockFetcher, reporter: Reporter<W>) -> Self {
        Self {
            fetcher,
            reporter,
            builder: None,
        }
    }

    pub fn with_builder_check(mut self, check: BuilderCheck, logger: MissLogger) -> Self {
        self.fetcher = self.fetcher.with_last_transaction(true);
        self.builder = Some((check, logger));
        self
    }

    pub async fn handle_block(&self, height: u64) -> Result<BlockOutcome, MonitorError> {
        let snapshot = self.fetcher.fetch(height).await?;
        self.reporter.report(&snapshot)?;

        let builder = match (&self.builder, &snapshot.last_transaction) {
            (Some((check, logger)), Some(tx)) => {
                let verdict = check.classify(height, &tx.input);
                if !verdict.is_match() {
                    let block = &snapshot.block;
                    let record = MissRecord::now(
                        height,
                        gas_used_percentage(block.gas_used, block.gas_limit),
                        block.tx_count(),
                    );
                    logger.record(&record).await;
                }
                Some(verdict)
            }
            _ => None,
        };

        Ok(BlockOutcome { height, builder })
    }

    /// Per-event error boundary: failures are logged and the event dropped.
    pub async fn process(&self, height: u64) -> Option<BlockOutcome> {
        match self.handle_block(height).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!(block = height, "Error fetching gas parameters: {}", e);
                None
            }
        }
    }

    /// Spawns one task per received height. Returns once the channel is closed
    /// and every spawned task has finished.
    pub async fn run(self: Arc<Self>, mut blocks: mpsc::Receiver<u64>) {
        let mut tasks = JoinSet::new();

        while let Some(height) = blocks.recv().await {
            let monitor = Arc::clone(&self);
            tasks.spawn(async move { monitor.process(height).await });

            while let Some(done) = tasks.try_join_next() {
                log_panicked(done);
            }
        }

        while let Some(done) = tasks.join_next().await {
            log_panicked(done);
        }
    }
}

fn log_panicked(result: Result<Option<BlockOutcome>, tokio::task::JoinError>) {
    if let Err(e) = result {
        error!("block task failed: {}", e);
    }
}

/// Runs the watcher against `config.rpc_url` until the listener stops.
pub async fn watch(config: WatchConfig) -> Result<(), MonitorError> {
    let transport = TransportBuilder::new(config.rpc_url.clone())
        .timeout(config.request_timeout)
        .build_http()?;
    let rpc = Arc::new(RpcClient::new(transport));

    let fetcher = BlockFetcher::new(Arc::clone(&rpc)).retry_delay(config.retry_delay);
    let reporter = Reporter::stdout();
    let mut monitor = Monitor::new(fetcher, reporter.clone());
    if config.builder_check {
        monitor = monitor
            .with_builder_check(BuilderCheck::default(), MissLogger::new(config.miss_log.clone()));
    }

    info!(
        endpoint = %config.rpc_url,
        builder_check = config.builder_check,
        "Starting gas watcher"
    );
    reporter.line("Watching gas parameters...")?;

    let (blocks, listener) =
        BlockListener::new(rpc, config.poll_interval).spawn(BLOCK_CHANNEL_CAPACITY);
    Arc::new(monitor).run(blocks).await;

    match listener.await {
        Ok(()) => Err(MonitorError::ListenerStopped("channel closed".to_string())),
        Err(e) => Err(MonitorError::ListenerStopped(e.to_string())),
    }
}
