/// Position accounting types
///
/// Raw quantities stay in BigUint and base-asset values in wei-denominated
/// BigUint/BigInt all the way through the accounting; floats appear only in
/// the summary document.

use chrono::{DateTime, Utc};
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::Zero;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Per-token flow within one transaction hash
#[derive(Debug, Clone, Default)]
pub struct TokenFlow {
    pub inflow: BigUint,
    pub outflow: BigUint,
    pub senders: HashSet<String>,
    pub recipients: HashSet<String>,
    pub decimals: u8,
    pub symbol: String,
}

/// All of a wallet's legs within one transaction hash: native and
/// wrapped-native deltas (netted together when consumed, so a wrap-then-swap
/// is not double counted) plus per-token flows.
#[derive(Debug, Clone)]
pub struct TxLegAggregate {
    pub hash: String,
    pub block_number: u64,
    pub timestamp: i64,
    pub native_delta: BigInt,
    pub wrapped_delta: BigInt,
    pub token_flows: HashMap<String, TokenFlow>,
}

impl TxLegAggregate {
    pub fn new(hash: &str, block_number: u64, timestamp: i64) -> Self {
        Self {
            hash: hash.to_string(),
            block_number,
            timestamp,
            native_delta: BigInt::zero(),
            wrapped_delta: BigInt::zero(),
            token_flows: HashMap::new(),
        }
    }

    /// Net base-asset movement for the hash (positive = wallet received)
    pub fn base_delta(&self) -> BigInt {
        &self.native_delta + &self.wrapped_delta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    In,
    Out,
}

/// One net token movement to classify, in chronological order
#[derive(Debug, Clone)]
pub struct TokenMove {
    pub hash: String,
    pub block_number: u64,
    pub timestamp: i64,
    pub token: String,
    pub symbol: String,
    pub decimals: u8,
    pub direction: MoveDirection,
    pub qty_raw: BigUint,
    pub senders: HashSet<String>,
    pub recipients: HashSet<String>,
}

/// How a leg's base-asset value was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementSignal {
    /// Net base leg in the same transaction hash
    TxNet,
    /// Net base flow of the enclosing block
    BlockNet,
    /// Net base flow of a nearby block at the given offset
    NearBlock(i64),
    /// Spot-price estimate
    Oracle,
    /// No signal found
    Unresolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegKind {
    Buy,
    Sell,
    /// Zero-cost inbound lot
    Airdrop,
    /// Zero-proceeds outbound reduction (not a realized sale)
    Disposal,
}

/// Outcome of the classification cascade for one token movement
#[derive(Debug, Clone)]
pub struct ResolvedLeg {
    pub kind: LegKind,
    /// Cost (buys) or proceeds (sells) in wei; zero for airdrops/disposals
    pub base_value_wei: BigUint,
    pub signal: SettlementSignal,
}

/// Running average-cost state for one token held by the wallet.
///
/// remaining_qty and remaining_cost_basis move together under the
/// average-cost rule; neither can go negative (sells clamp to the remaining
/// quantity, and the exact integer division drains the basis to zero when
/// the last unit leaves).
#[derive(Debug, Clone)]
pub struct TokenPositionState {
    pub token: String,
    pub symbol: String,
    pub decimals: u8,
    pub remaining_qty: BigUint,
    pub remaining_cost_basis: BigUint,
    pub realized_pnl: BigInt,
    pub gross_bought: BigUint,
    pub gross_sold: BigUint,
    pub airdrop_qty: BigUint,
    /// Wei spent on buys (trade legs only)
    pub base_spent: BigUint,
    /// Wei received from sells (trade legs only)
    pub base_received: BigUint,
    pub buy_count: u32,
    pub sell_count: u32,
}

impl TokenPositionState {
    pub fn new(token: &str, symbol: &str, decimals: u8) -> Self {
        Self {
            token: token.to_string(),
            symbol: symbol.to_string(),
            decimals,
            remaining_qty: BigUint::zero(),
            remaining_cost_basis: BigUint::zero(),
            realized_pnl: BigInt::zero(),
            gross_bought: BigUint::zero(),
            gross_sold: BigUint::zero(),
            airdrop_qty: BigUint::zero(),
            base_spent: BigUint::zero(),
            base_received: BigUint::zero(),
            buy_count: 0,
            sell_count: 0,
        }
    }

    /// Buy of `qty` raw units for `cost_wei`
    pub fn apply_buy(&mut self, qty: &BigUint, cost_wei: &BigUint) {
        self.remaining_qty += qty;
        self.remaining_cost_basis += cost_wei;
        self.gross_bought += qty;
        self.base_spent += cost_wei;
        self.buy_count += 1;
    }

    /// Sell of `qty` raw units for `proceeds_wei`, clamped to the held
    /// quantity. cost_of_sold = remaining_cost_basis * sold / remaining_qty
    /// in exact integer arithmetic.
    pub fn apply_sell(&mut self, qty: &BigUint, proceeds_wei: &BigUint) {
        let sold = qty.min(&self.remaining_qty).clone();
        let cost_of_sold = if self.remaining_qty.is_zero() {
            BigUint::zero()
        } else {
            (&self.remaining_cost_basis * &sold) / &self.remaining_qty
        };

        self.realized_pnl += BigInt::from(proceeds_wei.clone()) - BigInt::from(cost_of_sold.clone());
        self.remaining_qty -= &sold;
        self.remaining_cost_basis -= &cost_of_sold;
        self.gross_sold += &sold;
        self.base_received += proceeds_wei;
        self.sell_count += 1;

        if self.remaining_qty.is_zero() {
            // Any integer-division residue dies with the position
            self.remaining_cost_basis = BigUint::zero();
        }
    }

    /// Zero-cost inbound lot
    pub fn apply_airdrop(&mut self, qty: &BigUint) {
        self.remaining_qty += qty;
        self.airdrop_qty += qty;
    }

    /// Zero-proceeds disposal: quantity and cost basis shrink proportionally,
    /// realized PnL untouched.
    pub fn apply_disposal(&mut self, qty: &BigUint) {
        let removed = qty.min(&self.remaining_qty).clone();
        let basis_removed = if self.remaining_qty.is_zero() {
            BigUint::zero()
        } else {
            (&self.remaining_cost_basis * &removed) / &self.remaining_qty
        };
        self.remaining_qty -= &removed;
        self.remaining_cost_basis -= &basis_removed;

        if self.remaining_qty.is_zero() {
            self.remaining_cost_basis = BigUint::zero();
        }
    }

    pub fn remaining_units(&self) -> f64 {
        crate::utils::raw_to_units(&self.remaining_qty, self.decimals)
    }

    pub fn has_activity(&self) -> bool {
        self.buy_count > 0
            || self.sell_count > 0
            || !self.airdrop_qty.is_zero()
            || !self.remaining_qty.is_zero()
    }
}

/// Wei (1e18 per native unit) to display native units
pub fn wei_to_native(wei: &BigUint) -> f64 {
    crate::utils::raw_to_units(wei, 18)
}

pub fn wei_to_native_signed(wei: &BigInt) -> f64 {
    let magnitude = crate::utils::raw_to_units(wei.magnitude(), 18);
    match wei.sign() {
        Sign::Minus => -magnitude,
        _ => magnitude,
    }
}

// ---------------------------------------------------------------------------
// Summary document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct TokenBreakdown {
    pub token: String,
    pub symbol: String,
    pub remaining_units: f64,
    pub remaining_cost_native: f64,
    pub realized_pnl_native: f64,
    pub unrealized_pnl_native: f64,
    pub current_value_native: f64,
    pub current_value_usd: f64,
    pub gross_bought_units: f64,
    pub gross_sold_units: f64,
    pub airdrop_units: f64,
    pub buy_count: u32,
    pub sell_count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenPositionEntry {
    pub token: String,
    pub symbol: String,
    pub units: f64,
    pub cost_basis_native: f64,
    pub current_value_native: f64,
    pub current_value_usd: f64,
    pub unrealized_pnl_native: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RealizedEntry {
    pub token: String,
    pub symbol: String,
    pub realized_pnl_native: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AirdropEntry {
    pub token: String,
    pub symbol: String,
    pub units: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NftAirdropEntry {
    pub contract: String,
    pub collection: String,
    pub count: usize,
}

/// Wallet PnL summary document, cached by the service layer
#[derive(Debug, Clone, Serialize)]
pub struct WalletPnlSummary {
    pub wallet: String,
    pub realized_pnl_native: f64,
    pub unrealized_pnl_native: f64,
    /// Base asset received from token sells (trade legs only)
    pub trade_base_in_native: f64,
    /// Base asset spent on token buys (trade legs only)
    pub trade_base_out_native: f64,
    pub tokens: Vec<TokenBreakdown>,
    pub open_positions: Vec<OpenPositionEntry>,
    /// Ranked realized gains from closed positions only (zero or dust
    /// remaining quantity). Realized PnL still held in an open position
    /// counts toward `realized_pnl_native` but is not ranked here.
    pub top_closed_gains: Vec<RealizedEntry>,
    /// Ranked realized losses from closed positions only
    pub top_closed_losses: Vec<RealizedEntry>,
    pub airdrops: Vec<AirdropEntry>,
    pub nft_airdrops: Vec<NftAirdropEntry>,
    pub complete: bool,
    pub generated_at: DateTime<Utc>,
}
