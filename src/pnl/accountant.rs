/// Wallet position accountant
///
/// Replays a wallet's fetched history into per-token average-cost state.
/// Leg aggregation nets native and wrapped-native flows per hash, builds the
/// per-block base-flow fallback signal, classifies every token movement
/// through the cascade (with the price oracle as last resort), and folds the
/// result into the wallet PnL summary document.

use super::classify::{classify, ClassifyContext};
use super::types::*;
use crate::apis::price::{PriceOracle, SpotPrice};
use crate::crawler::AccountHistory;
use crate::errors::ScopeResult;
use crate::logger::{self, LogTag};
use chrono::Utc;
use num_bigint::{BigInt, BigUint};
use num_traits::Zero;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Accountant knobs, normally derived from [`crate::config::Configs`]
#[derive(Debug, Clone)]
pub struct AccountantConfig {
    pub wrapped_native_address: String,
    pub router_addresses: HashSet<String>,
    pub near_block_window: u64,
    pub dust_token_units: f64,
    pub dust_usd: f64,
    /// Entries listed in the top gains/losses rankings
    pub rank_size: usize,
}

impl Default for AccountantConfig {
    fn default() -> Self {
        Self {
            wrapped_native_address: "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2".to_string(),
            router_addresses: HashSet::new(),
            near_block_window: 2,
            dust_token_units: 5.0,
            dust_usd: 1.0,
            rank_size: 10,
        }
    }
}

impl AccountantConfig {
    pub fn from_configs(configs: &crate::config::Configs) -> Self {
        Self {
            wrapped_native_address: configs.wrapped_native_address.to_lowercase(),
            router_addresses: configs
                .router_addresses
                .iter()
                .map(|a| a.to_lowercase())
                .collect(),
            near_block_window: configs.near_block_window,
            dust_token_units: configs.dust_token_units,
            dust_usd: configs.dust_usd,
            rank_size: 10,
        }
    }
}

pub struct PositionAccountant {
    config: AccountantConfig,
    oracle: Arc<dyn PriceOracle>,
}

impl PositionAccountant {
    pub fn new(config: AccountantConfig, oracle: Arc<dyn PriceOracle>) -> Self {
        Self { config, oracle }
    }

    /// Compute the wallet PnL summary from fetched history.
    ///
    /// A single token's failure (price lookup and the like) degrades that
    /// token's entry to a zero-valued quote; the rest of the wallet proceeds.
    pub async fn compute(
        &self,
        wallet: &str,
        history: &AccountHistory,
    ) -> ScopeResult<WalletPnlSummary> {
        let wallet = wallet.to_lowercase();

        let aggregates = self.build_leg_aggregates(&wallet, history);
        let block_net = build_block_net(&aggregates);
        let moves = collect_token_moves(&aggregates);

        logger::info(
            LogTag::Pnl,
            &format!(
                "{}: {} tx aggregates, {} token moves",
                wallet,
                aggregates.len(),
                moves.len()
            ),
        );

        let mut states: HashMap<String, TokenPositionState> = HashMap::new();
        // Spot quotes resolved once per token per computation
        let mut quotes: HashMap<String, SpotPrice> = HashMap::new();

        for mv in &moves {
            let tx = &aggregates[&mv.hash];
            let ctx = ClassifyContext {
                tx,
                block_net: &block_net,
                routers: &self.config.router_addresses,
                near_block_window: self.config.near_block_window,
            };

            let leg = match classify(&ctx, mv) {
                Some(leg) => leg,
                None => self.oracle_fallback(mv, &mut quotes).await,
            };

            let state = states
                .entry(mv.token.clone())
                .or_insert_with(|| TokenPositionState::new(&mv.token, &mv.symbol, mv.decimals));

            match leg.kind {
                LegKind::Buy => state.apply_buy(&mv.qty_raw, &leg.base_value_wei),
                LegKind::Sell => state.apply_sell(&mv.qty_raw, &leg.base_value_wei),
                LegKind::Airdrop => state.apply_airdrop(&mv.qty_raw),
                LegKind::Disposal => state.apply_disposal(&mv.qty_raw),
            }
        }

        self.build_summary(&wallet, states, quotes, history).await
    }

    /// Aggregate the wallet's transfers per transaction hash. Native and
    /// wrapped-native legs land in their own deltas so base_delta() nets a
    /// wrap-then-swap into a single flow.
    fn build_leg_aggregates(
        &self,
        wallet: &str,
        history: &AccountHistory,
    ) -> HashMap<String, TxLegAggregate> {
        let mut aggregates: HashMap<String, TxLegAggregate> = HashMap::new();

        for t in &history.native {
            if t.failed || t.from == t.to {
                continue;
            }
            let agg = aggregates
                .entry(t.hash.clone())
                .or_insert_with(|| TxLegAggregate::new(&t.hash, t.block_number, t.timestamp));
            let value = BigInt::from(t.value_wei.clone());
            if t.to == wallet {
                agg.native_delta += &value;
            }
            if t.from == wallet {
                agg.native_delta -= &value;
            }
        }

        for t in &history.erc20 {
            if t.from == t.to {
                continue;
            }
            let agg = aggregates
                .entry(t.hash.clone())
                .or_insert_with(|| TxLegAggregate::new(&t.hash, t.block_number, t.timestamp));

            if t.contract == self.config.wrapped_native_address {
                let value = BigInt::from(t.value_raw.clone());
                if t.to == wallet {
                    agg.wrapped_delta += &value;
                }
                if t.from == wallet {
                    agg.wrapped_delta -= &value;
                }
                continue;
            }

            let flow = agg.token_flows.entry(t.contract.clone()).or_default();
            flow.decimals = t.decimals;
            if flow.symbol.is_empty() {
                flow.symbol = t.symbol.clone();
            }
            if t.to == wallet {
                flow.inflow += &t.value_raw;
                flow.senders.insert(t.from.clone());
            }
            if t.from == wallet {
                flow.outflow += &t.value_raw;
                flow.recipients.insert(t.to.clone());
            }
        }

        aggregates
    }

    /// Last-resort estimate: value the moved quantity at spot. An unknown or
    /// failed quote leaves an inflow as an airdrop and an outflow as a
    /// zero-proceeds disposal.
    async fn oracle_fallback(
        &self,
        mv: &TokenMove,
        quotes: &mut HashMap<String, SpotPrice>,
    ) -> ResolvedLeg {
        let quote = self.quote_for(&mv.token, quotes).await;

        if quote.price_native > 0.0 {
            let units = crate::utils::raw_to_units(&mv.qty_raw, mv.decimals);
            let value_wei = crate::utils::units_to_raw(units * quote.price_native, 18);
            if !value_wei.is_zero() {
                let kind = match mv.direction {
                    MoveDirection::In => LegKind::Buy,
                    MoveDirection::Out => LegKind::Sell,
                };
                return ResolvedLeg {
                    kind,
                    base_value_wei: value_wei,
                    signal: SettlementSignal::Oracle,
                };
            }
        }

        match mv.direction {
            MoveDirection::In => ResolvedLeg {
                kind: LegKind::Airdrop,
                base_value_wei: BigUint::zero(),
                signal: SettlementSignal::Unresolved,
            },
            MoveDirection::Out => ResolvedLeg {
                kind: LegKind::Disposal,
                base_value_wei: BigUint::zero(),
                signal: SettlementSignal::Unresolved,
            },
        }
    }

    async fn quote_for(
        &self,
        token: &str,
        quotes: &mut HashMap<String, SpotPrice>,
    ) -> SpotPrice {
        if let Some(quote) = quotes.get(token) {
            return quote.clone();
        }
        let quote = match self.oracle.spot_price(token).await {
            Ok(q) => q,
            Err(e) => {
                // Degrade this token only; the wallet computation continues
                logger::warning(
                    LogTag::Pnl,
                    &format!("price lookup failed for {}: {}, using zero quote", token, e),
                );
                SpotPrice::unknown()
            }
        };
        quotes.insert(token.to_string(), quote.clone());
        quote
    }

    async fn build_summary(
        &self,
        wallet: &str,
        states: HashMap<String, TokenPositionState>,
        mut quotes: HashMap<String, SpotPrice>,
        history: &AccountHistory,
    ) -> ScopeResult<WalletPnlSummary> {
        let mut tokens = Vec::new();
        let mut open_positions = Vec::new();
        let mut closed = Vec::new();
        let mut airdrops = Vec::new();

        let mut realized_total = BigInt::zero();
        let mut unrealized_total = 0.0;
        let mut base_in = BigUint::zero();
        let mut base_out = BigUint::zero();

        let mut ordered: Vec<&TokenPositionState> =
            states.values().filter(|s| s.has_activity()).collect();
        ordered.sort_by(|a, b| a.token.cmp(&b.token));

        for state in ordered {
            let quote = self.quote_for(&state.token, &mut quotes).await;

            let units = state.remaining_units();
            let value_native = units * quote.price_native;
            let value_usd = units * quote.price_usd;
            let cost_native = wei_to_native(&state.remaining_cost_basis);
            let unrealized = value_native - cost_native;
            let realized = wei_to_native_signed(&state.realized_pnl);

            realized_total += &state.realized_pnl;
            base_in += &state.base_received;
            base_out += &state.base_spent;

            let closed_out = units <= self.config.dust_token_units;
            if !closed_out {
                unrealized_total += unrealized;
            }

            // Open view: real quantity, above dust, and not priced to nothing
            let above_usd_dust = !quote.is_known() || value_usd >= self.config.dust_usd;
            if !closed_out && above_usd_dust {
                open_positions.push(OpenPositionEntry {
                    token: state.token.clone(),
                    symbol: state.symbol.clone(),
                    units,
                    cost_basis_native: cost_native,
                    current_value_native: value_native,
                    current_value_usd: value_usd,
                    unrealized_pnl_native: unrealized,
                });
            }

            if closed_out && !state.realized_pnl.is_zero() {
                closed.push(RealizedEntry {
                    token: state.token.clone(),
                    symbol: state.symbol.clone(),
                    realized_pnl_native: realized,
                });
            }

            if !state.airdrop_qty.is_zero() {
                airdrops.push(AirdropEntry {
                    token: state.token.clone(),
                    symbol: state.symbol.clone(),
                    units: crate::utils::raw_to_units(&state.airdrop_qty, state.decimals),
                });
            }

            tokens.push(TokenBreakdown {
                token: state.token.clone(),
                symbol: state.symbol.clone(),
                remaining_units: units,
                remaining_cost_native: cost_native,
                realized_pnl_native: realized,
                unrealized_pnl_native: if closed_out { 0.0 } else { unrealized },
                current_value_native: value_native,
                current_value_usd: value_usd,
                gross_bought_units: crate::utils::raw_to_units(&state.gross_bought, state.decimals),
                gross_sold_units: crate::utils::raw_to_units(&state.gross_sold, state.decimals),
                airdrop_units: crate::utils::raw_to_units(&state.airdrop_qty, state.decimals),
                buy_count: state.buy_count,
                sell_count: state.sell_count,
            });
        }

        // Rankings draw from closed positions only; realized PnL banked in
        // a still-open position stays in the headline total
        let mut top_closed_gains: Vec<RealizedEntry> = closed
            .iter()
            .filter(|e| e.realized_pnl_native > 0.0)
            .cloned()
            .collect();
        top_closed_gains.sort_by(|a, b| {
            b.realized_pnl_native
                .partial_cmp(&a.realized_pnl_native)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        top_closed_gains.truncate(self.config.rank_size);

        let mut top_closed_losses: Vec<RealizedEntry> = closed
            .iter()
            .filter(|e| e.realized_pnl_native < 0.0)
            .cloned()
            .collect();
        top_closed_losses.sort_by(|a, b| {
            a.realized_pnl_native
                .partial_cmp(&b.realized_pnl_native)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        top_closed_losses.truncate(self.config.rank_size);

        open_positions.sort_by(|a, b| {
            b.current_value_native
                .partial_cmp(&a.current_value_native)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let nft_airdrops = collect_nft_airdrops(wallet, history);

        Ok(WalletPnlSummary {
            wallet: wallet.to_string(),
            realized_pnl_native: wei_to_native_signed(&realized_total),
            unrealized_pnl_native: unrealized_total,
            trade_base_in_native: wei_to_native(&base_in),
            trade_base_out_native: wei_to_native(&base_out),
            tokens,
            open_positions,
            top_closed_gains,
            top_closed_losses,
            airdrops,
            nft_airdrops,
            complete: history.complete,
            generated_at: Utc::now(),
        })
    }
}

/// Net base-asset flow per block, the fallback settlement signal for
/// router-mediated trades spanning multiple calls
fn build_block_net(aggregates: &HashMap<String, TxLegAggregate>) -> HashMap<u64, BigInt> {
    let mut block_net: HashMap<u64, BigInt> = HashMap::new();
    for agg in aggregates.values() {
        let delta = agg.base_delta();
        if !delta.is_zero() {
            *block_net.entry(agg.block_number).or_insert_with(BigInt::zero) += delta;
        }
    }
    block_net
}

/// Net each hash's per-token flows into chronologically ordered moves
fn collect_token_moves(aggregates: &HashMap<String, TxLegAggregate>) -> Vec<TokenMove> {
    let mut moves = Vec::new();

    for agg in aggregates.values() {
        for (token, flow) in &agg.token_flows {
            let (direction, qty) = if flow.inflow > flow.outflow {
                (MoveDirection::In, &flow.inflow - &flow.outflow)
            } else if flow.outflow > flow.inflow {
                (MoveDirection::Out, &flow.outflow - &flow.inflow)
            } else {
                continue; // wash within one hash
            };

            moves.push(TokenMove {
                hash: agg.hash.clone(),
                block_number: agg.block_number,
                timestamp: agg.timestamp,
                token: token.clone(),
                symbol: flow.symbol.clone(),
                decimals: flow.decimals,
                direction,
                qty_raw: qty,
                senders: flow.senders.clone(),
                recipients: flow.recipients.clone(),
            });
        }
    }

    // Strict chronological replay; hash breaks ties for determinism
    moves.sort_by(|a, b| {
        (a.timestamp, a.block_number, a.hash.clone()).cmp(&(
            b.timestamp,
            b.block_number,
            b.hash.clone(),
        ))
    });
    moves
}

/// NFT inflows are zero-cost by definition, tracked by collection and count
fn collect_nft_airdrops(wallet: &str, history: &AccountHistory) -> Vec<NftAirdropEntry> {
    let mut by_contract: HashMap<String, NftAirdropEntry> = HashMap::new();

    for t in &history.nft {
        if t.to != wallet {
            continue;
        }
        let entry = by_contract
            .entry(t.contract.clone())
            .or_insert_with(|| NftAirdropEntry {
                contract: t.contract.clone(),
                collection: t.collection.clone(),
                count: 0,
            });
        entry.count += 1;
    }

    let mut entries: Vec<NftAirdropEntry> = by_contract.into_values().collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::price::SpotPrice;
    use crate::crawler::{Erc20Transfer, NativeTransfer, NftTransfer};
    use async_trait::async_trait;

    const WALLET: &str = "0x1110000000000000000000000000000000000001";
    const TOKEN: &str = "0xaaa000000000000000000000000000000000000a";
    const OTHER: &str = "0xbbb000000000000000000000000000000000000b";
    const POOL: &str = "0xccc000000000000000000000000000000000000c";

    struct FixedOracle {
        price_native: f64,
        price_usd: f64,
    }

    #[async_trait]
    impl PriceOracle for FixedOracle {
        async fn spot_price(&self, _token: &str) -> ScopeResult<SpotPrice> {
            Ok(SpotPrice {
                price_native: self.price_native,
                price_usd: self.price_usd,
                market_cap_usd: None,
            })
        }
    }

    struct FailingOracle;

    #[async_trait]
    impl PriceOracle for FailingOracle {
        async fn spot_price(&self, token: &str) -> ScopeResult<SpotPrice> {
            Err(crate::errors::ScopeError::Price(format!(
                "timeout for {}",
                token
            )))
        }
    }

    fn native(hash: &str, block: u64, ts: i64, from: &str, to: &str, wei: u128) -> NativeTransfer {
        NativeTransfer {
            hash: hash.to_string(),
            block_number: block,
            timestamp: ts,
            from: from.to_string(),
            to: to.to_string(),
            value_wei: BigUint::from(wei),
            failed: false,
        }
    }

    fn erc20(
        hash: &str,
        block: u64,
        ts: i64,
        from: &str,
        to: &str,
        contract: &str,
        raw: u128,
    ) -> Erc20Transfer {
        Erc20Transfer {
            hash: hash.to_string(),
            block_number: block,
            timestamp: ts,
            from: from.to_string(),
            to: to.to_string(),
            contract: contract.to_string(),
            value_raw: BigUint::from(raw),
            decimals: 6,
            symbol: "TKN".to_string(),
        }
    }

    fn accountant(oracle: Arc<dyn PriceOracle>) -> PositionAccountant {
        PositionAccountant::new(
            AccountantConfig {
                dust_token_units: 0.0,
                dust_usd: 0.0,
                ..AccountantConfig::default()
            },
            oracle,
        )
    }

    /// Buy 1,000,000 units for 1.0 native in H1, sell 500,000
    /// for 0.8 in H2: realized +0.3, remaining 500,000 at basis 0.5.
    #[tokio::test]
    async fn test_clean_buy_then_sell_scenario() {
        let one_native: u128 = 1_000_000_000_000_000_000;
        let history = AccountHistory {
            native: vec![
                native("0xh1", 100, 1_000, WALLET, POOL, one_native),
                native("0xh2", 200, 2_000, POOL, WALLET, one_native * 8 / 10),
            ],
            erc20: vec![
                erc20("0xh1", 100, 1_000, POOL, WALLET, TOKEN, 1_000_000),
                erc20("0xh2", 200, 2_000, WALLET, POOL, TOKEN, 500_000),
            ],
            nft: vec![],
            complete: true,
        };

        let acct = accountant(Arc::new(FixedOracle {
            price_native: 0.0,
            price_usd: 0.0,
        }));
        let summary = acct.compute(WALLET, &history).await.unwrap();

        assert!((summary.realized_pnl_native - 0.3).abs() < 1e-9);
        let breakdown = &summary.tokens[0];
        assert!((breakdown.remaining_units - 0.5).abs() < 1e-9);
        assert!((breakdown.remaining_cost_native - 0.5).abs() < 1e-9);
        assert!((summary.trade_base_out_native - 1.0).abs() < 1e-9);
        assert!((summary.trade_base_in_native - 0.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_wrap_then_swap_not_double_counted() {
        // One hash: wallet sends 1.0 native out, receives 1.0 wrapped back
        // out to the pool, token comes in. Net base must be -1.0, not -2.0.
        let one: u128 = 1_000_000_000_000_000_000;
        let wrapped = AccountantConfig::default().wrapped_native_address;
        let history = AccountHistory {
            native: vec![native("0xh1", 100, 1_000, WALLET, POOL, one)],
            erc20: vec![
                // wrapped leg bounced through the wallet
                Erc20Transfer {
                    decimals: 18,
                    symbol: "WNATIVE".to_string(),
                    ..erc20("0xh1", 100, 1_000, POOL, WALLET, &wrapped, one / 2)
                },
                Erc20Transfer {
                    decimals: 18,
                    symbol: "WNATIVE".to_string(),
                    ..erc20("0xh1", 100, 1_000, WALLET, POOL, &wrapped, one / 2)
                },
                erc20("0xh1", 100, 1_000, POOL, WALLET, TOKEN, 2_000_000),
            ],
            nft: vec![],
            complete: true,
        };

        let acct = accountant(Arc::new(FixedOracle {
            price_native: 0.0,
            price_usd: 0.0,
        }));
        let summary = acct.compute(WALLET, &history).await.unwrap();

        assert!((summary.trade_base_out_native - 1.0).abs() < 1e-9);
        assert!((summary.tokens[0].remaining_cost_native - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unresolved_inflow_is_airdrop() {
        // Token arrives from a stranger with no base leg anywhere and no
        // usable price: zero-cost airdrop lot
        let history = AccountHistory {
            native: vec![],
            erc20: vec![erc20("0xh1", 100, 1_000, OTHER, WALLET, TOKEN, 750_000)],
            nft: vec![],
            complete: true,
        };

        let acct = accountant(Arc::new(FixedOracle {
            price_native: 0.0,
            price_usd: 0.0,
        }));
        let summary = acct.compute(WALLET, &history).await.unwrap();

        assert_eq!(summary.airdrops.len(), 1);
        assert!((summary.airdrops[0].units - 0.75).abs() < 1e-9);
        assert_eq!(summary.realized_pnl_native, 0.0);
        assert_eq!(summary.trade_base_out_native, 0.0);
    }

    #[tokio::test]
    async fn test_oracle_estimate_prices_orphan_buy() {
        // No settlement signal on chain, but the oracle knows a price:
        // the inflow becomes a buy at the estimated value
        let history = AccountHistory {
            native: vec![],
            erc20: vec![erc20("0xh1", 100, 1_000, OTHER, WALLET, TOKEN, 2_000_000)],
            nft: vec![],
            complete: true,
        };

        let acct = accountant(Arc::new(FixedOracle {
            price_native: 0.5,
            price_usd: 1000.0,
        }));
        let summary = acct.compute(WALLET, &history).await.unwrap();

        assert!(summary.airdrops.is_empty());
        let breakdown = &summary.tokens[0];
        assert_eq!(breakdown.buy_count, 1);
        // 2.0 units at 0.5 native each
        assert!((breakdown.remaining_cost_native - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_price_failure_degrades_token_not_wallet() {
        let history = AccountHistory {
            native: vec![],
            erc20: vec![
                erc20("0xh1", 100, 1_000, OTHER, WALLET, TOKEN, 500_000),
                erc20("0xh2", 200, 2_000, OTHER, WALLET, OTHER, 300_000),
            ],
            nft: vec![],
            complete: true,
        };

        let acct = accountant(Arc::new(FailingOracle));
        let summary = acct.compute(WALLET, &history).await.unwrap();

        // Both tokens survive as zero-quoted airdrops instead of aborting
        assert_eq!(summary.tokens.len(), 2);
        assert_eq!(summary.airdrops.len(), 2);
        assert_eq!(summary.unrealized_pnl_native, 0.0);
    }

    #[tokio::test]
    async fn test_rankings_cover_closed_positions_only() {
        let one: u128 = 1_000_000_000_000_000_000;
        let history = AccountHistory {
            native: vec![
                // TOKEN: partial exit, stays open with realized +0.3
                native("0xh1", 100, 1_000, WALLET, POOL, one),
                native("0xh2", 200, 2_000, POOL, WALLET, one * 8 / 10),
                // OTHER: full exit with realized +0.5
                native("0xh3", 300, 3_000, WALLET, POOL, one),
                native("0xh4", 400, 4_000, POOL, WALLET, one * 15 / 10),
            ],
            erc20: vec![
                erc20("0xh1", 100, 1_000, POOL, WALLET, TOKEN, 1_000_000),
                erc20("0xh2", 200, 2_000, WALLET, POOL, TOKEN, 500_000),
                erc20("0xh3", 300, 3_000, POOL, WALLET, OTHER, 1_000_000),
                erc20("0xh4", 400, 4_000, WALLET, POOL, OTHER, 1_000_000),
            ],
            nft: vec![],
            complete: true,
        };

        let acct = accountant(Arc::new(FixedOracle {
            price_native: 0.0,
            price_usd: 0.0,
        }));
        let summary = acct.compute(WALLET, &history).await.unwrap();

        // Headline total carries both positions' realized PnL
        assert!((summary.realized_pnl_native - 0.8).abs() < 1e-9);

        // Only the fully exited position is ranked
        assert_eq!(summary.top_closed_gains.len(), 1);
        assert_eq!(summary.top_closed_gains[0].token, OTHER);
        assert!((summary.top_closed_gains[0].realized_pnl_native - 0.5).abs() < 1e-9);
        assert!(summary.top_closed_losses.is_empty());
    }

    #[tokio::test]
    async fn test_nft_inflows_tracked_by_collection() {
        let history = AccountHistory {
            native: vec![],
            erc20: vec![],
            nft: vec![
                NftTransfer {
                    hash: "0xn1".to_string(),
                    block_number: 10,
                    timestamp: 100,
                    from: OTHER.to_string(),
                    to: WALLET.to_string(),
                    contract: "0xnft1".to_string(),
                    token_id: "1".to_string(),
                    collection: "Apes".to_string(),
                },
                NftTransfer {
                    hash: "0xn2".to_string(),
                    block_number: 11,
                    timestamp: 110,
                    from: OTHER.to_string(),
                    to: WALLET.to_string(),
                    contract: "0xnft1".to_string(),
                    token_id: "2".to_string(),
                    collection: "Apes".to_string(),
                },
                NftTransfer {
                    hash: "0xn3".to_string(),
                    block_number: 12,
                    timestamp: 120,
                    from: WALLET.to_string(),
                    to: OTHER.to_string(),
                    contract: "0xnft2".to_string(),
                    token_id: "9".to_string(),
                    collection: "Punks".to_string(),
                },
            ],
            complete: true,
        };

        let acct = accountant(Arc::new(FixedOracle {
            price_native: 0.0,
            price_usd: 0.0,
        }));
        let summary = acct.compute(WALLET, &history).await.unwrap();

        assert_eq!(summary.nft_airdrops.len(), 1);
        assert_eq!(summary.nft_airdrops[0].collection, "Apes");
        assert_eq!(summary.nft_airdrops[0].count, 2);
    }

    #[tokio::test]
    async fn test_bonding_curve_mint_uses_block_net() {
        // Token minted straight from its own contract in a hash with no
        // base leg; another hash in the same block carries the payment
        let one: u128 = 1_000_000_000_000_000_000;
        let history = AccountHistory {
            native: vec![native("0xpay", 100, 1_000, WALLET, POOL, one)],
            erc20: vec![erc20("0xmint", 100, 1_000, TOKEN, WALLET, TOKEN, 4_000_000)],
            nft: vec![],
            complete: true,
        };

        let acct = accountant(Arc::new(FixedOracle {
            price_native: 0.0,
            price_usd: 0.0,
        }));
        let summary = acct.compute(WALLET, &history).await.unwrap();

        let breakdown = &summary.tokens[0];
        assert_eq!(breakdown.buy_count, 1);
        assert!((breakdown.remaining_cost_native - 1.0).abs() < 1e-9);
        assert!(summary.airdrops.is_empty());
    }
}
