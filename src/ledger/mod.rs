/// Balance ledger reconstruction from ERC-20 Transfer events
///
/// Replays an ordered event set into address balances plus a burned-supply
/// counter. Replay is pure: the same event set produces the same ledger no
/// matter how the crawler batched its fetches, because events are re-sorted
/// by (block_number, log_index) before application.

use crate::apis::explorer::{parse_u64, parse_uint, topic_to_address, RawLogEntry};
use crate::config::is_burn_sentinel;
use crate::errors::{ScopeError, ScopeResult};
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::Zero;
use std::collections::HashMap;

/// One decoded Transfer event, ordered by (block_number, log_index)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEvent {
    pub tx_hash: String,
    pub block_number: u64,
    pub log_index: u64,
    pub from: String,
    pub to: String,
    pub value_raw: BigUint,
    pub token_decimals: u8,
}

impl TransferEvent {
    /// Decode from a raw getLogs entry. Transfer logs carry the sender and
    /// recipient as indexed topics and the uint256 amount in the data field.
    pub fn from_log_entry(raw: &RawLogEntry, token_decimals: u8) -> ScopeResult<Self> {
        if raw.topics.len() < 3 {
            return Err(ScopeError::Parse(format!(
                "transfer log {} has {} topics, expected 3",
                raw.transaction_hash,
                raw.topics.len()
            )));
        }

        Ok(Self {
            tx_hash: raw.transaction_hash.clone(),
            block_number: parse_u64(&raw.block_number)?,
            log_index: parse_u64(&raw.log_index).unwrap_or(0),
            from: topic_to_address(&raw.topics[1])?,
            to: topic_to_address(&raw.topics[2])?,
            value_raw: parse_uint(&raw.data)?,
            token_decimals,
        })
    }

    pub fn ordering_key(&self) -> (u64, u64) {
        (self.block_number, self.log_index)
    }
}

/// Reconstructed balances: address -> signed raw balance, plus burned supply
#[derive(Debug, Clone, Default)]
pub struct BalanceLedger {
    pub balances: HashMap<String, BigInt>,
    pub burned: BigUint,
}

impl BalanceLedger {
    /// Sum of all positive balances
    pub fn positive_supply(&self) -> BigUint {
        let mut total = BigUint::zero();
        for balance in self.balances.values() {
            if balance.sign() == Sign::Plus {
                total += balance.magnitude();
            }
        }
        total
    }

    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }
}

/// Replay events into a fresh ledger.
///
/// Events are sorted by (block_number, log_index) first so out-of-order page
/// arrival cannot change the result. Mints (from a sentinel) only credit the
/// recipient; burns (to a sentinel) credit the burned counter. Non-positive
/// balances are pruned after replay.
pub fn build_ledger(events: &[TransferEvent]) -> BalanceLedger {
    let mut ordered: Vec<&TransferEvent> = events.iter().collect();
    ordered.sort_by_key(|e| e.ordering_key());

    let mut ledger = BalanceLedger::default();

    for event in ordered {
        let value = BigInt::from(event.value_raw.clone());

        if !is_burn_sentinel(&event.from) {
            *ledger
                .balances
                .entry(event.from.clone())
                .or_insert_with(BigInt::zero) -= &value;
        }

        if is_burn_sentinel(&event.to) {
            ledger.burned += &event.value_raw;
        } else {
            *ledger
                .balances
                .entry(event.to.clone())
                .or_insert_with(BigInt::zero) += &value;
        }
    }

    ledger
        .balances
        .retain(|_, balance| balance.sign() == Sign::Plus);

    ledger
}
