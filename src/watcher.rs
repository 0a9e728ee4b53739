use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::rpc::RpcClient;

/// Follows the chain head by polling `eth_blockNumber`.
///
/// The first poll only records where the head is. Every later poll that sees
/// the head move up emits each height above the previously recorded head, in
/// ascending order. A head that moves down (a reorg, or a lagging node behind
/// a load balancer) is recorded as is, so the heights above it are emitted
/// again once the head passes them.
#[derive(Debug, Clone)]
pub struct BlockListener {
    rpc: Arc<RpcClient>,
    poll_interval: Duration,
    last_seen: Option<u64>,
}

impl BlockListener {
    pub fn new(rpc: Arc<RpcClient>, poll_interval: Duration) -> Self {
        Self {
            rpc,
            poll_interval,
            last_seen: None,
        }
    }

    /// Heights to emit after observing `latest`.
    pub fn advance(&mut self, latest: u64) -> std::ops::RangeInclusive<u64> {
        match self.last_seen {
            Some(last) if latest > last => {
                self.last_seen = Some(latest);
                (last + 1)..=latest
            }
            Some(last) if latest < last => {
                debug!(block = latest, previous = last, "chain head moved back");
                self.last_seen = Some(latest);
                empty_range()
            }
            Some(_) => empty_range(),
            None => {
                self.last_seen = Some(latest);
                empty_range()
            }
        }
    }

    pub fn spawn(self, capacity: usize) -> (mpsc::Receiver<u64>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity);
        let handle = tokio::spawn(self.watch_new_blocks(tx));
        (rx, handle)
    }

    /// Polls until the receiving side goes away.
    pub async fn watch_new_blocks(mut self, tx: mpsc::Sender<u64>) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = tx.closed() => {
                    debug!("block receiver dropped, stopping listener");
                    return;
                }
            }

            let latest = match self.rpc.get_block_number().await {
                Ok(latest) => latest,
                Err(e) => {
                    warn!("Failed to poll block number: {}", e);
                    continue;
                }
            };

            if self.last_seen.is_none() {
                info!(block = latest, "Following chain head");
            }

            for height in self.advance(latest) {
                debug!(block = height, "new block");
                if tx.send(height).await.is_err() {
                    debug!("block receiver dropped, stopping listener");
                    return;
                }
            }
        }
    }
}

#[allow(clippy::reversed_empty_ranges)]
fn empty_range() -> std::ops::RangeInclusive<u64> {
    1..=0
}
