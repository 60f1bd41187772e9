//! Scripted explorer and oracle for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chainscope::apis::explorer::{ContractCreation, ExplorerApi, RawLogEntry, RawTxRecord};
use chainscope::apis::price::{PriceOracle, SpotPrice};
use chainscope::errors::{ScopeError, ScopeResult};
use num_bigint::BigUint;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// One synthetic Transfer event the mock serves as a log entry
#[derive(Debug, Clone)]
pub struct LogFixture {
    pub block: u64,
    pub log_index: u64,
    pub from: String,
    pub to: String,
    pub value: u64,
}

pub fn log_fixture(block: u64, log_index: u64, from: &str, to: &str, value: u64) -> LogFixture {
    LogFixture {
        block,
        log_index,
        from: from.to_string(),
        to: to.to_string(),
        value,
    }
}

fn address_topic(address: &str) -> String {
    let hex = address.strip_prefix("0x").unwrap_or(address);
    format!("0x{:0>64}", hex)
}

/// Range failure rule: requests spanning more than `max_span` blocks that
/// include `pivot_block` answer "range too large"
#[derive(Debug, Clone, Copy)]
pub struct RangeFailRule {
    pub pivot_block: u64,
    pub max_span: u64,
}

#[derive(Default)]
pub struct MockExplorer {
    pub logs: Vec<LogFixture>,
    pub native: Vec<RawTxRecord>,
    pub erc20: Vec<RawTxRecord>,
    pub nft: Vec<RawTxRecord>,
    pub total_supply: Option<u64>,
    pub creation_block: Option<u64>,
    pub head_block: u64,
    pub range_fail: Option<RangeFailRule>,
    /// Windows (from, to) that fail with a transient network error
    pub broken_windows: Mutex<Vec<(u64, u64)>>,
    pub log_calls: AtomicUsize,
}

impl MockExplorer {
    pub fn new() -> Self {
        Self {
            head_block: 1_000_000,
            ..Default::default()
        }
    }

    pub fn log_call_count(&self) -> usize {
        self.log_calls.load(Ordering::SeqCst)
    }
}

pub fn native_record(
    hash: &str,
    block: u64,
    ts: i64,
    from: &str,
    to: &str,
    value_wei: u128,
) -> RawTxRecord {
    RawTxRecord {
        hash: hash.to_string(),
        block_number: block.to_string(),
        time_stamp: ts.to_string(),
        from: from.to_string(),
        to: to.to_string(),
        value: Some(value_wei.to_string()),
        contract_address: None,
        token_name: None,
        token_symbol: None,
        token_decimal: None,
        token_id: None,
        is_error: Some("0".to_string()),
    }
}

pub fn erc20_record(
    hash: &str,
    block: u64,
    ts: i64,
    from: &str,
    to: &str,
    contract: &str,
    value_raw: u128,
) -> RawTxRecord {
    RawTxRecord {
        hash: hash.to_string(),
        block_number: block.to_string(),
        time_stamp: ts.to_string(),
        from: from.to_string(),
        to: to.to_string(),
        value: Some(value_raw.to_string()),
        contract_address: Some(contract.to_string()),
        token_name: Some("Mock Token".to_string()),
        token_symbol: Some("MOCK".to_string()),
        token_decimal: Some("6".to_string()),
        token_id: None,
        is_error: None,
    }
}

fn page_of<T: Clone>(records: &[T], page: usize, offset: usize) -> Vec<T> {
    let start = (page.saturating_sub(1)) * offset;
    records.iter().skip(start).take(offset).cloned().collect()
}

#[async_trait]
impl ExplorerApi for MockExplorer {
    async fn transfer_log_page(
        &self,
        _token: &str,
        from_block: u64,
        to_block: u64,
        page: usize,
        offset: usize,
    ) -> ScopeResult<Vec<RawLogEntry>> {
        self.log_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(rule) = self.range_fail {
            let span = to_block - from_block + 1;
            if span > rule.max_span && from_block <= rule.pivot_block && rule.pivot_block <= to_block
            {
                return Err(ScopeError::RangeTooLarge {
                    from_block,
                    to_block,
                });
            }
        }

        if self
            .broken_windows
            .lock()
            .unwrap()
            .iter()
            .any(|(f, t)| *f <= from_block && to_block <= *t)
        {
            return Err(ScopeError::Network("simulated outage".to_string()));
        }

        let in_range: Vec<RawLogEntry> = self
            .logs
            .iter()
            .filter(|l| from_block <= l.block && l.block <= to_block)
            .map(|l| RawLogEntry {
                address: "0xtoken".to_string(),
                topics: vec![
                    chainscope::apis::explorer::TRANSFER_TOPIC.to_string(),
                    address_topic(&l.from),
                    address_topic(&l.to),
                ],
                data: format!("0x{:x}", l.value),
                block_number: format!("0x{:x}", l.block),
                time_stamp: format!("0x{:x}", l.block * 12),
                log_index: format!("0x{:x}", l.log_index),
                transaction_hash: format!("0xtx{}x{}", l.block, l.log_index),
            })
            .collect();

        Ok(page_of(&in_range, page, offset))
    }

    async fn native_tx_page(
        &self,
        _address: &str,
        _start_block: u64,
        page: usize,
        offset: usize,
    ) -> ScopeResult<Vec<RawTxRecord>> {
        Ok(page_of(&self.native, page, offset))
    }

    async fn erc20_tx_page(
        &self,
        _address: &str,
        _start_block: u64,
        page: usize,
        offset: usize,
    ) -> ScopeResult<Vec<RawTxRecord>> {
        Ok(page_of(&self.erc20, page, offset))
    }

    async fn nft_tx_page(
        &self,
        _address: &str,
        _start_block: u64,
        page: usize,
        offset: usize,
    ) -> ScopeResult<Vec<RawTxRecord>> {
        Ok(page_of(&self.nft, page, offset))
    }

    async fn contract_creation(&self, address: &str) -> ScopeResult<Option<ContractCreation>> {
        Ok(self.creation_block.map(|block| ContractCreation {
            contract_address: address.to_string(),
            contract_creator: "0xc0ffee0000000000000000000000000000000001".to_string(),
            tx_hash: "0xcreate".to_string(),
            block_number: Some(block.to_string()),
        }))
    }

    async fn total_supply(&self, _token: &str) -> ScopeResult<Option<BigUint>> {
        Ok(self.total_supply.map(BigUint::from))
    }

    async fn block_by_timestamp(&self, _timestamp: i64) -> ScopeResult<u64> {
        Ok(self.head_block)
    }
}

pub struct FixedOracle {
    pub price_native: f64,
    pub price_usd: f64,
    pub market_cap_usd: Option<f64>,
}

#[async_trait]
impl PriceOracle for FixedOracle {
    async fn spot_price(&self, _token: &str) -> ScopeResult<SpotPrice> {
        Ok(SpotPrice {
            price_native: self.price_native,
            price_usd: self.price_usd,
            market_cap_usd: self.market_cap_usd,
        })
    }
}
