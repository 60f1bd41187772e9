/// Trade-leg classification cascade
///
/// An ordered list of pure classifier rules, tried in fixed priority order.
/// Each rule maps (tx legs, block legs, token move) to Some(resolved leg) or
/// passes. Order is the contract: the primary same-hash rule always wins
/// over block-level signals so a clean swap is never double counted.

use super::types::{
    LegKind, MoveDirection, ResolvedLeg, SettlementSignal, TokenMove, TxLegAggregate,
};
use crate::logger::{self, LogTag};
use num_bigint::{BigInt, Sign};
use num_traits::Zero;
use std::collections::{HashMap, HashSet};

/// Everything a rule may look at
pub struct ClassifyContext<'a> {
    pub tx: &'a TxLegAggregate,
    /// Net base-asset flow per block across the wallet's whole history
    pub block_net: &'a HashMap<u64, BigInt>,
    /// Known router/forwarder contracts
    pub routers: &'a HashSet<String>,
    /// Blocks searched on each side for settlement flow
    pub near_block_window: u64,
}

pub type Classifier = fn(&ClassifyContext, &TokenMove) -> Option<ResolvedLeg>;

/// The cascade, in priority order
pub fn cascade() -> &'static [(&'static str, Classifier)] {
    &[
        ("single-token-net-leg", single_token_net_leg),
        ("contract-sender-block-net", contract_sender_block_net),
        ("near-block-net", near_block_net),
    ]
}

/// Run the cascade. None means no on-chain settlement signal exists and the
/// caller falls through to the price-oracle estimate.
pub fn classify(ctx: &ClassifyContext, mv: &TokenMove) -> Option<ResolvedLeg> {
    for (name, rule) in cascade() {
        if let Some(leg) = rule(ctx, mv) {
            logger::debug(
                LogTag::Pnl,
                &format!(
                    "{} {} {:?} resolved by {} ({:?})",
                    mv.hash, mv.symbol, mv.direction, name, leg.signal
                ),
            );
            return Some(leg);
        }
    }
    None
}

/// Primary rule: exactly one non-base token moved in this hash, so the
/// hash's entire net base delta belongs to it. Wallet paid (negative net)
/// with token inflow = buy; wallet received with token outflow = sell.
fn single_token_net_leg(ctx: &ClassifyContext, mv: &TokenMove) -> Option<ResolvedLeg> {
    if ctx.tx.token_flows.len() != 1 {
        return None;
    }

    let base = ctx.tx.base_delta();
    match (mv.direction, base.sign()) {
        (MoveDirection::In, Sign::Minus) => Some(ResolvedLeg {
            kind: LegKind::Buy,
            base_value_wei: base.magnitude().clone(),
            signal: SettlementSignal::TxNet,
        }),
        (MoveDirection::Out, Sign::Plus) => Some(ResolvedLeg {
            kind: LegKind::Sell,
            base_value_wei: base.magnitude().clone(),
            signal: SettlementSignal::TxNet,
        }),
        _ => None,
    }
}

/// Secondary rule: bonding-curve mints and router settlement. The token side
/// came straight from the token contract or a known router/forwarder, and
/// the base asset settled in a sibling call of the same block.
fn contract_sender_block_net(ctx: &ClassifyContext, mv: &TokenMove) -> Option<ResolvedLeg> {
    let counterparty_is_machine = match mv.direction {
        MoveDirection::In => mv
            .senders
            .iter()
            .any(|s| s == &mv.token || ctx.routers.contains(s)),
        MoveDirection::Out => mv
            .recipients
            .iter()
            .any(|r| r == &mv.token || ctx.routers.contains(r)),
    };
    if !counterparty_is_machine {
        return None;
    }

    let net = ctx.block_net.get(&ctx.tx.block_number)?;
    leg_from_block_net(mv.direction, net, SettlementSignal::BlockNet)
}

/// Near-block search: proxy contracts can settle the base asset a block or
/// two away from the token transfer. Nearest offset wins.
fn near_block_net(ctx: &ClassifyContext, mv: &TokenMove) -> Option<ResolvedLeg> {
    for distance in 1..=ctx.near_block_window {
        let candidates = [
            Some(ctx.tx.block_number + distance),
            ctx.tx.block_number.checked_sub(distance),
        ];
        for candidate in candidates.into_iter().flatten() {
            if let Some(net) = ctx.block_net.get(&candidate) {
                let offset = candidate as i64 - ctx.tx.block_number as i64;
                if let Some(leg) =
                    leg_from_block_net(mv.direction, net, SettlementSignal::NearBlock(offset))
                {
                    return Some(leg);
                }
            }
        }
    }
    None
}

/// A block-level net funds a buy only when negative (wallet paid out) and a
/// sell only when positive; a wrong-signed net is no signal at all.
fn leg_from_block_net(
    direction: MoveDirection,
    net: &BigInt,
    signal: SettlementSignal,
) -> Option<ResolvedLeg> {
    if net.is_zero() {
        return None;
    }
    match (direction, net.sign()) {
        (MoveDirection::In, Sign::Minus) => Some(ResolvedLeg {
            kind: LegKind::Buy,
            base_value_wei: net.magnitude().clone(),
            signal,
        }),
        (MoveDirection::Out, Sign::Plus) => Some(ResolvedLeg {
            kind: LegKind::Sell,
            base_value_wei: net.magnitude().clone(),
            signal,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pnl::types::TokenFlow;
    use num_bigint::BigUint;

    const TOKEN: &str = "0xaaa0000000000000000000000000000000000001";
    const ROUTER: &str = "0xbbb0000000000000000000000000000000000002";

    fn tx_with_one_token(base_delta: i64) -> TxLegAggregate {
        let mut tx = TxLegAggregate::new("0xh1", 100, 1_700_000_000);
        tx.native_delta = BigInt::from(base_delta);
        tx.token_flows
            .insert(TOKEN.to_string(), TokenFlow::default());
        tx
    }

    fn inflow_move(sender: &str) -> TokenMove {
        let mut senders = HashSet::new();
        senders.insert(sender.to_string());
        TokenMove {
            hash: "0xh1".to_string(),
            block_number: 100,
            timestamp: 1_700_000_000,
            token: TOKEN.to_string(),
            symbol: "TKN".to_string(),
            decimals: 18,
            direction: MoveDirection::In,
            qty_raw: BigUint::from(1_000u32),
            senders,
            recipients: HashSet::new(),
        }
    }

    fn outflow_move(recipient: &str) -> TokenMove {
        let mut mv = inflow_move("0xelse000000000000000000000000000000000009");
        mv.direction = MoveDirection::Out;
        mv.recipients = HashSet::from([recipient.to_string()]);
        mv
    }

    #[test]
    fn test_primary_rule_buy_and_sell() {
        let routers = HashSet::new();
        let block_net = HashMap::new();

        let tx = tx_with_one_token(-5_000);
        let ctx = ClassifyContext {
            tx: &tx,
            block_net: &block_net,
            routers: &routers,
            near_block_window: 2,
        };
        let leg = classify(&ctx, &inflow_move("0xpool")).unwrap();
        assert_eq!(leg.kind, LegKind::Buy);
        assert_eq!(leg.base_value_wei, BigUint::from(5_000u32));
        assert_eq!(leg.signal, SettlementSignal::TxNet);

        let tx = tx_with_one_token(3_000);
        let ctx = ClassifyContext {
            tx: &tx,
            block_net: &block_net,
            routers: &routers,
            near_block_window: 2,
        };
        let leg = classify(&ctx, &outflow_move("0xpool")).unwrap();
        assert_eq!(leg.kind, LegKind::Sell);
        assert_eq!(leg.base_value_wei, BigUint::from(3_000u32));
    }

    #[test]
    fn test_primary_wins_over_block_signal() {
        // A same-block secondary signal exists, but the unambiguous tx-level
        // net leg must be used (no double counting)
        let routers = HashSet::new();
        let mut block_net = HashMap::new();
        block_net.insert(100u64, BigInt::from(-999_999));

        let tx = tx_with_one_token(-5_000);
        let ctx = ClassifyContext {
            tx: &tx,
            block_net: &block_net,
            routers: &routers,
            near_block_window: 2,
        };
        let leg = classify(&ctx, &inflow_move(TOKEN)).unwrap();
        assert_eq!(leg.signal, SettlementSignal::TxNet);
        assert_eq!(leg.base_value_wei, BigUint::from(5_000u32));
    }

    #[test]
    fn test_contract_sender_falls_back_to_block_net() {
        // No base leg in the hash; the token came from its own contract
        // (bonding-curve mint), so the block's net funds the buy
        let routers = HashSet::new();
        let mut block_net = HashMap::new();
        block_net.insert(100u64, BigInt::from(-7_000));

        let tx = tx_with_one_token(0);
        let ctx = ClassifyContext {
            tx: &tx,
            block_net: &block_net,
            routers: &routers,
            near_block_window: 2,
        };
        let leg = classify(&ctx, &inflow_move(TOKEN)).unwrap();
        assert_eq!(leg.kind, LegKind::Buy);
        assert_eq!(leg.signal, SettlementSignal::BlockNet);
        assert_eq!(leg.base_value_wei, BigUint::from(7_000u32));
    }

    #[test]
    fn test_router_recipient_sell_via_block_net() {
        let routers = HashSet::from([ROUTER.to_string()]);
        let mut block_net = HashMap::new();
        block_net.insert(100u64, BigInt::from(4_200));

        let tx = tx_with_one_token(0);
        let ctx = ClassifyContext {
            tx: &tx,
            block_net: &block_net,
            routers: &routers,
            near_block_window: 2,
        };
        let leg = classify(&ctx, &outflow_move(ROUTER)).unwrap();
        assert_eq!(leg.kind, LegKind::Sell);
        assert_eq!(leg.signal, SettlementSignal::BlockNet);
    }

    #[test]
    fn test_near_block_prefers_nearest_offset() {
        // Signals exist at +1 and +2; the cascade must take +1
        let routers = HashSet::new();
        let mut block_net = HashMap::new();
        block_net.insert(101u64, BigInt::from(-1_000));
        block_net.insert(102u64, BigInt::from(-9_999));

        let tx = tx_with_one_token(0);
        let ctx = ClassifyContext {
            tx: &tx,
            block_net: &block_net,
            routers: &routers,
            near_block_window: 2,
        };
        // Sender is a stranger, so rule 2 passes and rule 3 resolves
        let leg = classify(&ctx, &inflow_move("0xccc0000000000000000000000000000000000003")).unwrap();
        assert_eq!(leg.signal, SettlementSignal::NearBlock(1));
        assert_eq!(leg.base_value_wei, BigUint::from(1_000u32));
    }

    #[test]
    fn test_wrong_sign_block_net_is_no_signal() {
        // Inflow needs a negative (paid) net; a positive one resolves nothing
        let routers = HashSet::new();
        let mut block_net = HashMap::new();
        block_net.insert(100u64, BigInt::from(5_000));

        let tx = tx_with_one_token(0);
        let ctx = ClassifyContext {
            tx: &tx,
            block_net: &block_net,
            routers: &routers,
            near_block_window: 2,
        };
        assert!(classify(&ctx, &inflow_move(TOKEN)).is_none());
    }

    #[test]
    fn test_multi_token_hash_skips_primary() {
        let routers = HashSet::new();
        let block_net = HashMap::new();

        let mut tx = tx_with_one_token(-5_000);
        tx.token_flows
            .insert("0xother000000000000000000000000000000000004".to_string(), TokenFlow::default());

        let ctx = ClassifyContext {
            tx: &tx,
            block_net: &block_net,
            routers: &routers,
            near_block_window: 2,
        };
        // Two tokens moved: primary rule may not attribute the base leg
        assert!(classify(&ctx, &inflow_move("0xstranger00000000000000000000000000000005")).is_none());
    }
}
