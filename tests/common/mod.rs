#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use alloy::hex;
use async_trait::async_trait;
use gaswatch::rpc::Transport;
use gaswatch::RpcError;
use serde_json::{json, Value};

pub const GWEI: u64 = 1_000_000_000;

/// In-memory JSON-RPC node answering the handful of methods the watcher uses.
#[derive(Debug, Default)]
pub struct MockNode {
    state: Mutex<NodeState>,
}

#[derive(Debug, Default)]
struct NodeState {
    head: u64,
    blocks: HashMap<u64, Value>,
    transactions: HashMap<String, Value>,
    // number of `null` answers before a block becomes visible
    unindexed: HashMap<u64, usize>,
    failing_blocks: Vec<u64>,
    gas_price: Option<u64>,
    priority_fee: Option<u64>,
    calls: Vec<(String, Value)>,
}

pub fn tx_hash(block: u64, index: usize) -> String {
    format!("0x{:056x}{:08x}", block, index)
}

impl MockNode {
    pub fn new() -> Arc<Self> {
        let node = Self::default();
        {
            let mut state = node.state.lock().unwrap();
            state.gas_price = Some(26 * GWEI);
            state.priority_fee = Some(GWEI / 2 * 3);
        }
        Arc::new(node)
    }

    /// Adds a block whose transactions have the given input payloads.
    pub fn add_block(&self, number: u64, gas_used: u64, gas_limit: u64, payloads: &[&[u8]]) {
        let mut state = self.state.lock().unwrap();
        let hashes: Vec<String> = (0..payloads.len()).map(|i| tx_hash(number, i)).collect();

        for (hash, payload) in hashes.iter().zip(payloads) {
            state.transactions.insert(
                hash.clone(),
                json!({
                    "hash": hash,
                    "blockNumber": format!("0x{:x}", number),
                    "from": "0x1111111111111111111111111111111111111111",
                    "to": "0x2222222222222222222222222222222222222222",
                    "input": format!("0x{}", hex::encode(payload)),
                    "gas": "0x5208",
                    "value": "0x0",
                    "nonce": "0x0"
                }),
            );
        }

        state.blocks.insert(
            number,
            json!({
                "hash": format!("0x{:064x}", number),
                "number": format!("0x{:x}", number),
                "gasLimit": format!("0x{:x}", gas_limit),
                "gasUsed": format!("0x{:x}", gas_used),
                "timestamp": "0x65e1c8a0",
                "baseFeePerGas": format!("0x{:x}", 25 * GWEI),
                "miner": "0x3333333333333333333333333333333333333333",
                "transactions": hashes,
            }),
        );
        state.head = state.head.max(number);
    }

    pub fn remove_base_fee(&self, number: u64) {
        let mut state = self.state.lock().unwrap();
        if let Some(block) = state.blocks.get_mut(&number) {
            block.as_object_mut().unwrap().remove("baseFeePerGas");
        }
    }

    pub fn delay_indexing(&self, number: u64, null_answers: usize) {
        self.state.lock().unwrap().unindexed.insert(number, null_answers);
    }

    pub fn fail_block(&self, number: u64) {
        self.state.lock().unwrap().failing_blocks.push(number);
    }

    pub fn without_priority_fee(&self) {
        self.state.lock().unwrap().priority_fee = None;
    }

    pub fn calls(&self, method: &str) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }

    fn answer(&self, method: &str, params: &Value) -> Value {
        let mut state = self.state.lock().unwrap();
        state.calls.push((method.to_string(), params.clone()));

        match method {
            "eth_blockNumber" => json!({ "result": format!("0x{:x}", state.head) }),
            "eth_gasPrice" => match state.gas_price {
                Some(price) => json!({ "result": format!("0x{:x}", price) }),
                None => json!({ "error": { "code": -32000, "message": "no gas price" } }),
            },
            "eth_maxPriorityFeePerGas" => match state.priority_fee {
                Some(fee) => json!({ "result": format!("0x{:x}", fee) }),
                None => json!({ "error": { "code": -32601, "message": "method not found" } }),
            },
            "eth_getBlockByNumber" => {
                let tag = params[0].as_str().unwrap_or_default().to_string();
                let number = if tag == "latest" {
                    state.head
                } else {
                    u64::from_str_radix(tag.trim_start_matches("0x"), 16).unwrap()
                };

                if tag != "latest" && state.failing_blocks.contains(&number) {
                    return json!({ "error": { "code": -32603, "message": "internal error" } });
                }
                if let Some(remaining) = state.unindexed.get_mut(&number) {
                    if *remaining > 0 {
                        *remaining -= 1;
                        return json!({ "result": null });
                    }
                }
                json!({ "result": state.blocks.get(&number).cloned().unwrap_or(Value::Null) })
            }
            "eth_getTransactionByHash" => {
                let hash = params[0].as_str().unwrap_or_default();
                json!({ "result": state.transactions.get(hash).cloned().unwrap_or(Value::Null) })
            }
            other => json!({ "error": { "code": -32601, "message": format!("{} not supported", other) } }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockTransport(pub Arc<MockNode>);

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: String) -> Result<String, RpcError> {
        let request: Value =
            serde_json::from_str(&request).map_err(|e| RpcError::Parse(e.to_string()))?;
        let method = request["method"].as_str().unwrap_or_default();

        let mut response = self.0.answer(method, &request["params"]);
        response["jsonrpc"] = json!("2.0");
        response["id"] = request["id"].clone();

        Ok(response.to_string())
    }
}
