use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::rpc::{BlockTag, RpcClient};
use crate::types::{Block, FeeData, Transaction};
use crate::RpcError;

/// Everything the report and the builder check need for one height.
#[derive(Debug, Clone)]
pub struct BlockSnapshot {
    pub block: Block,
    pub fees: FeeData,
    pub last_transaction: Option<Transaction>,
}

#[derive(Debug, Clone)]
pub struct BlockFetcher {
    rpc: Arc<RpcClient>,
    retry_delay: Duration,
    with_last_transaction: bool,
}

impl BlockFetcher {
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self {
            rpc,
            retry_delay: Duration::from_secs(1),
            with_last_transaction: false,
        }
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_last_transaction(mut self, enabled: bool) -> Self {
        self.with_last_transaction = enabled;
        self
    }

    pub async fn fetch(&self, height: u64) -> Result<BlockSnapshot, RpcError> {
        let block = self.wait_for_block(height).await?;
        let fees = self.rpc.get_fee_data().await?;

        let last_transaction = match block.last_transaction() {
            Some(hash) if self.with_last_transaction => Some(
                self.rpc
                    .get_transaction_by_hash(hash)
                    .await?
                    .ok_or_else(|| {
                        RpcError::Response(format!(
                            "transaction 0x{:x} of block {} not found",
                            hash, height
                        ))
                    })?,
            ),
            _ => None,
        };

        Ok(BlockSnapshot {
            block,
            fees,
            last_transaction,
        })
    }

    // The notification can arrive before the node serves the block. There is
    // no upper bound on the number of attempts.
    async fn wait_for_block(&self, height: u64) -> Result<Block, RpcError> {
        let mut attempts = 0u64;

        loop {
            if let Some(block) = self.rpc.get_block_by_number(BlockTag::Number(height)).await? {
                return Ok(block);
            }

            attempts += 1;
            debug!(block = height, attempts, "block not available yet, retrying");
            tokio::time::sleep(self.retry_delay).await;
        }
    }
}
