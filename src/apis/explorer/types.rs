/// Explorer API response types
///
/// The explorer speaks untyped JSON with every numeric field encoded as a
/// string: decimal for account endpoints, 0x-prefixed hex for log endpoints.
/// Amounts are uint256 and must never pass through a float, so all value
/// parsing lands in BigUint.
use crate::errors::{ScopeError, ScopeResult};
use num_bigint::BigUint;
use num_traits::Num;
use serde::Deserialize;

/// Standard response envelope: {"status": "1", "message": "OK", "result": ...}
///
/// `result` is an array on success and a bare string describing the problem
/// on failure, so it stays a Value until the caller dispatches on status.
#[derive(Debug, Deserialize)]
pub struct RawResponse {
    pub status: Option<String>,
    pub message: Option<String>,
    pub result: serde_json::Value,
}

/// One event log entry from the getLogs endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLogEntry {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    pub block_number: String,
    pub time_stamp: String,
    pub log_index: String,
    pub transaction_hash: String,
}

/// One transfer record from the account-history endpoints
/// (native txlist, ERC-20 tokentx, NFT tokennfttx share this shape)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTxRecord {
    pub hash: String,
    pub block_number: String,
    pub time_stamp: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub token_name: Option<String>,
    #[serde(default)]
    pub token_symbol: Option<String>,
    #[serde(default)]
    pub token_decimal: Option<String>,
    #[serde(default, rename = "tokenID")]
    pub token_id: Option<String>,
    #[serde(default)]
    pub is_error: Option<String>,
}

impl RawTxRecord {
    pub fn failed(&self) -> bool {
        self.is_error.as_deref() == Some("1")
    }
}

/// Contract creation info
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCreation {
    pub contract_address: String,
    pub contract_creator: String,
    pub tx_hash: String,
    #[serde(default)]
    pub block_number: Option<String>,
}

/// Parse an explorer numeric string (decimal or 0x-hex) as an unsigned
/// arbitrary-precision integer.
pub fn parse_uint(s: &str) -> ScopeResult<BigUint> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if hex.is_empty() {
            return Ok(BigUint::from(0u32));
        }
        BigUint::from_str_radix(hex, 16)
            .map_err(|e| ScopeError::Parse(format!("bad hex uint '{}': {}", s, e)))
    } else {
        BigUint::from_str_radix(s, 10)
            .map_err(|e| ScopeError::Parse(format!("bad decimal uint '{}': {}", s, e)))
    }
}

/// Parse an explorer numeric string as u64 (block numbers, indices, timestamps)
pub fn parse_u64(s: &str) -> ScopeResult<u64> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
            .map_err(|e| ScopeError::Parse(format!("bad hex u64 '{}': {}", s, e)))
    } else {
        s.parse::<u64>()
            .map_err(|e| ScopeError::Parse(format!("bad decimal u64 '{}': {}", s, e)))
    }
}

/// Extract the 20-byte address from a 32-byte log topic
pub fn topic_to_address(topic: &str) -> ScopeResult<String> {
    let hex = topic.strip_prefix("0x").unwrap_or(topic);
    if hex.len() != 64 {
        return Err(ScopeError::Parse(format!("bad topic length: {}", topic)));
    }
    Ok(format!("0x{}", hex[24..].to_lowercase()))
}
