/// Wallet PnL engine
///
/// Leg aggregation, the buy/sell classification cascade, and average-cost
/// position accounting.

pub mod accountant;
pub mod classify;
pub mod types;

pub use accountant::{AccountantConfig, PositionAccountant};
pub use types::{
    LegKind, MoveDirection, ResolvedLeg, SettlementSignal, TokenMove, TokenPositionState,
    TxLegAggregate, WalletPnlSummary,
};
