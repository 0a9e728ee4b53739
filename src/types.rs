use alloy::primitives::{Address, Bytes, B256, U256, U64};
use serde::{Deserialize, Serialize};

/// Block as returned by `eth_getBlockByNumber` with `full_tx = false`.
///
/// Only the fields the gas report needs are decoded; everything else in the
/// node's response is ignored.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Block {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<B256>,
    #[serde(deserialize_with = "deserialize_hex_number")]
    pub number: u64,
    #[serde(rename = "gasLimit")]
    #[serde(deserialize_with = "deserialize_hex_number")]
    pub gas_limit: u64,
    #[serde(rename = "gasUsed")]
    #[serde(deserialize_with = "deserialize_hex_number")]
    pub gas_used: u64,
    #[serde(default, deserialize_with = "deserialize_hex_number")]
    pub timestamp: u64,
    // pre-London blocks carry no base fee
    #[serde(rename = "baseFeePerGas", default)]
    pub base_fee_per_gas: Option<U256>,
    #[serde(default)]
    pub transactions: Vec<B256>,
}

impl Block {
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn last_transaction(&self) -> Option<B256> {
        self.transactions.last().copied()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub hash: B256,
    #[serde(rename = "blockNumber", default)]
    pub block_number: Option<U64>,
    pub from: Address,
    #[serde(default)]
    pub to: Option<Address>,
    #[serde(default)]
    pub input: Bytes,
}

/// Current fee market estimate.
///
/// `max_fee_per_gas` and `max_priority_fee_per_gas` are only known when the
/// latest block reports a base fee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeData {
    pub gas_price: Option<U256>,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
}

impl FeeData {
    pub fn from_parts(
        gas_price: Option<U256>,
        base_fee: Option<U256>,
        priority_fee: Option<U256>,
    ) -> Self {
        match base_fee {
            Some(base_fee) => {
                let priority = priority_fee.unwrap_or(U256::from(DEFAULT_PRIORITY_FEE));
                Self {
                    gas_price,
                    max_fee_per_gas: Some(base_fee * U256::from(2) + priority),
                    max_priority_fee_per_gas: Some(priority),
                }
            }
            None => Self {
                gas_price,
                max_fee_per_gas: None,
                max_priority_fee_per_gas: None,
            },
        }
    }
}

/// 1 gwei, used when the node cannot suggest a priority fee.
pub const DEFAULT_PRIORITY_FEE: u64 = 1_000_000_000;

fn deserialize_hex_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = serde::Deserialize::deserialize(deserializer)?;
    u64::from_str_radix(s.trim_start_matches("0x"), 16).map_err(serde::de::Error::custom)
}
