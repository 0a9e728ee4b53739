use alloy::primitives::{B256, U256, U64};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::types::{Block, FeeData, Transaction};
use crate::RpcError;

#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    async fn execute(&self, request: String) -> Result<String, RpcError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Latest,
    Number(u64),
}

impl BlockTag {
    fn to_param(self) -> String {
        match self {
            BlockTag::Latest => "latest".to_string(),
            BlockTag::Number(number) => format!("0x{:x}", number),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RpcClient {
    pub transport: Arc<dyn Transport>,
    next_id: Arc<AtomicU64>,
}

/// Represents an RPC request to a Ethereum node
#[derive(Debug, Serialize)]
pub struct RpcRequest {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: serde_json::Value,
    pub id: u64,
}

impl RpcClient {
    pub fn new<T: Transport + 'static>(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    fn request(&self, method: &'static str, params: Value) -> RpcRequest {
        RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub async fn get_block_number(&self) -> Result<u64, RpcError> {
        let request = self.request("eth_blockNumber", json!([]));
        let number: U64 = self.execute(request).await?;

        Ok(number.to::<u64>())
    }

    /// Fetches a block with transaction hashes only.
    ///
    /// `Ok(None)` means the node answered `null`, i.e. it has not indexed the
    /// block yet.
    pub async fn get_block_by_number(&self, block: BlockTag) -> Result<Option<Block>, RpcError> {
        let request = self.request("eth_getBlockByNumber", json!([block.to_param(), false]));

        self.execute(request).await
    }

    pub async fn get_transaction_by_hash(
        &self,
        hash: B256,
    ) -> Result<Option<Transaction>, RpcError> {
        let request = self.request("eth_getTransactionByHash", json!([format!("0x{:x}", hash)]));

        self.execute(request).await
    }

    pub async fn get_gas_price(&self) -> Result<U256, RpcError> {
        let request = self.request("eth_gasPrice", json!([]));

        self.execute(request).await
    }

    pub async fn get_max_priority_fee_per_gas(&self) -> Result<U256, RpcError> {
        let request = self.request("eth_maxPriorityFeePerGas", json!([]));

        self.execute(request).await
    }

    /// Current fee estimate built from the gas price, the suggested priority
    /// fee and the latest block's base fee.
    ///
    /// Failures of the two price queries are tolerated; failing to fetch the
    /// latest block is not.
    pub async fn get_fee_data(&self) -> Result<FeeData, RpcError> {
        let (latest, gas_price, priority_fee) = futures::join!(
            self.get_block_by_number(BlockTag::Latest),
            self.get_gas_price(),
            self.get_max_priority_fee_per_gas(),
        );

        let gas_price = gas_price
            .map_err(|e| debug!("eth_gasPrice failed: {}", e))
            .ok();
        let priority_fee = priority_fee
            .map_err(|e| debug!("eth_maxPriorityFeePerGas failed: {}", e))
            .ok();
        let base_fee = latest?.and_then(|block| block.base_fee_per_gas);

        Ok(FeeData::from_parts(gas_price, base_fee, priority_fee))
    }

    pub async fn execute<T: DeserializeOwned>(&self, request: RpcRequest) -> Result<T, RpcError> {
        let body = serde_json::to_string(&request).map_err(|e| RpcError::Parse(e.to_string()))?;
        let response = self.transport.execute(body).await?;

        decode_response(request.method, &response)
    }
}

fn decode_response<T: DeserializeOwned>(method: &str, response: &str) -> Result<T, RpcError> {
    let mut envelope: Value =
        serde_json::from_str(response).map_err(|e| RpcError::Parse(e.to_string()))?;

    if let Some(error) = envelope.get("error").filter(|error| !error.is_null()) {
        return Err(RpcError::Rpc {
            code: error["code"].as_i64().unwrap_or_default(),
            message: error["message"].as_str().unwrap_or_default().to_string(),
        });
    }

    let result = envelope
        .get_mut("result")
        .map(Value::take)
        .ok_or_else(|| RpcError::Response(format!("{} response has no result", method)))?;

    serde_json::from_value(result).map_err(|e| RpcError::Parse(format!("{}: {}", method, e)))
}
