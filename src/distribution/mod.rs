/// Holder distribution and concentration analytics
///
/// Derives top-N holders, the Gini concentration index, and two histograms
/// from a reconstructed balance ledger. Percent math runs on raw integer
/// balances (micro-percent precision) so large supplies cannot drift through
/// floating point; floats appear only in the reported fields.

use crate::ledger::BalanceLedger;
use crate::logger::{self, LogTag};
use chrono::{DateTime, Utc};
use num_bigint::{BigUint, Sign};
use num_traits::{ToPrimitive, Zero};
use serde::Serialize;
use std::collections::HashSet;

/// Fixed percent-of-supply bands (upper bounds, half-open; last band catches
/// everything at or above the final bound)
const PERCENT_BANDS: &[(f64, &str)] = &[
    (0.01, "<0.01%"),
    (0.05, "<0.05%"),
    (0.10, "<0.10%"),
    (0.50, "<0.50%"),
    (1.00, "<1.00%"),
];
const PERCENT_OVERFLOW_LABEL: &str = ">=1.00%";

/// One holder row in the summary, recomputed whenever the ledger changes
#[derive(Debug, Clone, Serialize)]
pub struct HolderRow {
    pub address: String,
    pub balance_raw: String,
    pub percent_of_supply: f64,
}

/// One histogram band
#[derive(Debug, Clone, Serialize)]
pub struct HistogramBand {
    pub label: String,
    pub holder_count: usize,
}

/// Token distribution summary document, cached by the service layer
#[derive(Debug, Clone, Serialize)]
pub struct DistributionSummary {
    pub token: String,
    pub holder_count: usize,
    pub effective_supply_raw: String,
    pub top_holders: Vec<HolderRow>,
    pub top10_combined_percent: f64,
    pub gini: f64,
    pub percent_histogram: Vec<HistogramBand>,
    pub value_histogram: Vec<HistogramBand>,
    pub burn_percent: f64,
    pub generated_at: DateTime<Utc>,
}

/// Analyzer configuration
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Holders listed in the summary's top list
    pub top_n: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self { top_n: 10 }
    }
}

pub struct DistributionAnalyzer {
    config: AnalyzerConfig,
}

impl DistributionAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Analyze a ledger into a distribution summary.
    ///
    /// `total_supply` comes from the explorer when available; otherwise the
    /// effective supply is inferred from the ledger (positive sum + burned).
    /// `excluded` addresses (liquidity pools, the token's own address) are
    /// removed before any metric is computed, shrinking the considered
    /// supply accordingly.
    pub fn analyze(
        &self,
        token: &str,
        ledger: &BalanceLedger,
        total_supply: Option<BigUint>,
        excluded: &HashSet<String>,
        token_decimals: u8,
        price_usd: f64,
        market_cap_usd: Option<f64>,
    ) -> DistributionSummary {
        // Included holders, balances as unsigned raw units
        let mut holders: Vec<(String, BigUint)> = ledger
            .balances
            .iter()
            .filter(|(addr, balance)| {
                balance.sign() == Sign::Plus && !excluded.contains(addr.as_str())
            })
            .map(|(addr, balance)| (addr.clone(), balance.magnitude().clone()))
            .collect();
        holders.sort_by(|a, b| b.1.cmp(&a.1));

        let excluded_total: BigUint = ledger
            .balances
            .iter()
            .filter(|(addr, balance)| {
                balance.sign() == Sign::Plus && excluded.contains(addr.as_str())
            })
            .map(|(_, balance)| balance.magnitude().clone())
            .sum();

        // Effective supply: upstream total minus excluded stakes, or the
        // ledger's own included sum + burned when upstream has nothing
        let effective_supply = match total_supply {
            Some(supply) if supply > excluded_total => supply - &excluded_total,
            Some(_) | None => {
                let inferred = ledger.positive_supply() + ledger.burned.clone();
                if inferred > excluded_total {
                    inferred - &excluded_total
                } else {
                    BigUint::zero()
                }
            }
        };

        logger::debug(
            LogTag::Distribution,
            &format!(
                "{}: {} holders considered, effective supply {}",
                token,
                holders.len(),
                effective_supply
            ),
        );

        let top_holders: Vec<HolderRow> = holders
            .iter()
            .take(self.config.top_n)
            .map(|(addr, balance)| HolderRow {
                address: addr.clone(),
                balance_raw: balance.to_string(),
                percent_of_supply: percent_of_supply(balance, &effective_supply),
            })
            .collect();

        let top10_combined_percent = holders
            .iter()
            .take(10)
            .map(|(_, balance)| percent_of_supply(balance, &effective_supply))
            .sum::<f64>();

        let gini = gini_coefficient(&holders);

        let percent_histogram = percent_histogram(&holders, &effective_supply);
        let value_histogram =
            value_histogram(&holders, token_decimals, price_usd, market_cap_usd);

        let burn_percent = percent_of_supply(&ledger.burned, &effective_supply);

        DistributionSummary {
            token: token.to_string(),
            holder_count: holders.len(),
            effective_supply_raw: effective_supply.to_string(),
            top_holders,
            top10_combined_percent,
            gini,
            percent_histogram,
            value_histogram,
            burn_percent,
            generated_at: Utc::now(),
        }
    }
}

/// Percent of supply at 4 decimal digits, computed in integer space:
/// floor(balance * 1e6 / supply) / 1e4
pub fn percent_of_supply(balance: &BigUint, supply: &BigUint) -> f64 {
    if supply.is_zero() {
        return 0.0;
    }
    let micro = (balance * BigUint::from(1_000_000u32)) / supply;
    micro.to_u64().map(|m| m as f64 / 10_000.0).unwrap_or(100.0)
}

/// Gini coefficient over the share distribution of the included holders.
///
/// Sorted ascending, discrete Lorenz-curve area via cumulative sums,
/// G = 1 - 2 * area, clamped to [0, 1]. Zero or one holders define G = 0.
pub fn gini_coefficient(holders: &[(String, BigUint)]) -> f64 {
    let n = holders.len();
    if n <= 1 {
        return 0.0;
    }

    let included_total: BigUint = holders.iter().map(|(_, b)| b.clone()).sum();
    if included_total.is_zero() {
        return 0.0;
    }
    let total = included_total.to_f64().unwrap_or(f64::MAX);

    let mut shares: Vec<f64> = holders
        .iter()
        .map(|(_, b)| b.to_f64().unwrap_or(0.0) / total)
        .collect();
    shares.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    // Trapezoid integration of the Lorenz curve over n equal-width steps
    let mut area = 0.0;
    let mut cumulative = 0.0;
    for share in &shares {
        let previous = cumulative;
        cumulative += share;
        area += (previous + cumulative) / 2.0 / n as f64;
    }

    (1.0 - 2.0 * area).clamp(0.0, 1.0)
}

fn percent_histogram(
    holders: &[(String, BigUint)],
    effective_supply: &BigUint,
) -> Vec<HistogramBand> {
    let mut counts = vec![0usize; PERCENT_BANDS.len() + 1];

    for (_, balance) in holders {
        let pct = percent_of_supply(balance, effective_supply);
        let idx = PERCENT_BANDS
            .iter()
            .position(|(bound, _)| pct < *bound)
            .unwrap_or(PERCENT_BANDS.len());
        counts[idx] += 1;
    }

    PERCENT_BANDS
        .iter()
        .map(|(_, label)| label.to_string())
        .chain(std::iter::once(PERCENT_OVERFLOW_LABEL.to_string()))
        .zip(counts)
        .map(|(label, holder_count)| HistogramBand {
            label,
            holder_count,
        })
        .collect()
}

/// USD-value bands scaled to the token's market-cap magnitude: a microcap's
/// holders cluster in single-digit dollars while a majors' holders spread
/// into six figures, so the 6-way split keys off the cap.
fn value_bands_for_market_cap(market_cap_usd: f64) -> [f64; 5] {
    let scale = if market_cap_usd >= 100_000_000.0 {
        100.0
    } else if market_cap_usd >= 1_000_000.0 {
        10.0
    } else {
        1.0
    };
    [
        10.0 * scale,
        100.0 * scale,
        1_000.0 * scale,
        10_000.0 * scale,
        100_000.0 * scale,
    ]
}

fn value_histogram(
    holders: &[(String, BigUint)],
    token_decimals: u8,
    price_usd: f64,
    market_cap_usd: Option<f64>,
) -> Vec<HistogramBand> {
    let bands = value_bands_for_market_cap(market_cap_usd.unwrap_or(0.0));
    let mut counts = vec![0usize; bands.len() + 1];

    for (_, balance) in holders {
        let value = crate::utils::raw_to_units(balance, token_decimals) * price_usd;
        let idx = bands
            .iter()
            .position(|bound| value < *bound)
            .unwrap_or(bands.len());
        counts[idx] += 1;
    }

    let mut labels: Vec<String> = bands.iter().map(|b| format!("<${}", format_band(*b))).collect();
    labels.push(format!(">=${}", format_band(bands[bands.len() - 1])));

    labels
        .into_iter()
        .zip(counts)
        .map(|(label, holder_count)| HistogramBand {
            label,
            holder_count,
        })
        .collect()
}

fn format_band(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("{}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{}K", value / 1_000.0)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{build_ledger, TransferEvent};

    const ZERO: &str = "0x0000000000000000000000000000000000000000";

    fn mint(block: u64, index: u64, to: &str, value: u64) -> TransferEvent {
        TransferEvent {
            tx_hash: format!("0xmint{}{}", block, index),
            block_number: block,
            log_index: index,
            from: ZERO.to_string(),
            to: to.to_string(),
            value_raw: BigUint::from(value),
            token_decimals: 18,
        }
    }

    #[test]
    fn test_percent_of_supply_integer_precision() {
        // 1/3 of supply: floor(333333.33) micro-percent = 33.3333
        let pct = percent_of_supply(&BigUint::from(1u32), &BigUint::from(3u32));
        assert!((pct - 33.3333).abs() < 1e-9);

        assert_eq!(percent_of_supply(&BigUint::from(1u32), &BigUint::zero()), 0.0);
    }

    #[test]
    fn test_gini_bounds_and_edge_cases() {
        // Empty and single holder are defined as 0
        assert_eq!(gini_coefficient(&[]), 0.0);
        assert_eq!(
            gini_coefficient(&[("a".to_string(), BigUint::from(100u32))]),
            0.0
        );

        // Perfectly equal distribution is ~0
        let equal: Vec<(String, BigUint)> = (0..10)
            .map(|i| (format!("h{}", i), BigUint::from(500u32)))
            .collect();
        let g = gini_coefficient(&equal);
        assert!(g < 0.11, "equal distribution gini was {}", g);

        // One whale, many dust holders approaches 1
        let mut concentrated: Vec<(String, BigUint)> = (0..99)
            .map(|i| (format!("h{}", i), BigUint::from(1u32)))
            .collect();
        concentrated.push(("whale".to_string(), BigUint::from(1_000_000u64)));
        let g = gini_coefficient(&concentrated);
        assert!(g > 0.95 && g <= 1.0, "concentrated gini was {}", g);
    }

    #[test]
    fn test_lp_exclusion_scenario() {
        // Supply 1,000,000: LP holds 600k (excluded), B and C hold 200k each.
        // After exclusion: top-10 combined = 100% of the 400k considered
        // supply, and Gini over two equal holders = 0.
        let lp = "0x1110000000000000000000000000000000000001";
        let b = "0x2220000000000000000000000000000000000002";
        let c = "0x3330000000000000000000000000000000000003";

        let events = vec![
            mint(1, 0, lp, 600_000),
            mint(1, 1, b, 200_000),
            mint(1, 2, c, 200_000),
        ];
        let ledger = build_ledger(&events);

        let mut excluded = HashSet::new();
        excluded.insert(lp.to_string());

        let analyzer = DistributionAnalyzer::new(AnalyzerConfig::default());
        let summary = analyzer.analyze(
            "0xtoken",
            &ledger,
            Some(BigUint::from(1_000_000u64)),
            &excluded,
            18,
            0.0,
            None,
        );

        assert_eq!(summary.holder_count, 2);
        assert!((summary.top10_combined_percent - 100.0).abs() < 1e-6);
        assert_eq!(summary.gini, 0.0);
        assert_eq!(summary.effective_supply_raw, "400000");
    }

    #[test]
    fn test_supply_inferred_when_upstream_missing() {
        let a = "0xaaa0000000000000000000000000000000000001";
        let events = vec![mint(1, 0, a, 12_345)];
        let ledger = build_ledger(&events);

        let analyzer = DistributionAnalyzer::new(AnalyzerConfig::default());
        let summary =
            analyzer.analyze("0xtoken", &ledger, None, &HashSet::new(), 18, 0.0, None);

        assert_eq!(summary.effective_supply_raw, "12345");
        assert!((summary.top10_combined_percent - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_percent_histogram_bands() {
        // One holder at 60%, one at 0.4%, one at 0.004%
        let holders = vec![
            ("w".to_string(), BigUint::from(600_000u64)),
            ("m".to_string(), BigUint::from(4_000u64)),
            ("d".to_string(), BigUint::from(40u64)),
        ];
        let supply = BigUint::from(1_000_000u64);
        let hist = percent_histogram(&holders, &supply);

        assert_eq!(hist.len(), 6);
        assert_eq!(hist[0].label, "<0.01%");
        assert_eq!(hist[0].holder_count, 1); // 0.004%
        assert_eq!(hist[3].holder_count, 1); // 0.4% lands in <0.50%
        assert_eq!(hist[5].label, ">=1.00%");
        assert_eq!(hist[5].holder_count, 1); // 60%
    }

    #[test]
    fn test_value_bands_scale_with_market_cap() {
        assert_eq!(value_bands_for_market_cap(50_000.0)[0], 10.0);
        assert_eq!(value_bands_for_market_cap(5_000_000.0)[0], 100.0);
        assert_eq!(value_bands_for_market_cap(500_000_000.0)[0], 1_000.0);
    }

    #[test]
    fn test_burn_percent() {
        let a = "0xaaa0000000000000000000000000000000000001";
        let dead = "0x000000000000000000000000000000000000dead";
        let mut events = vec![mint(1, 0, a, 1_000)];
        events.push(TransferEvent {
            tx_hash: "0xburn".to_string(),
            block_number: 2,
            log_index: 0,
            from: a.to_string(),
            to: dead.to_string(),
            value_raw: BigUint::from(250u32),
            token_decimals: 18,
        });
        let ledger = build_ledger(&events);

        let analyzer = DistributionAnalyzer::new(AnalyzerConfig::default());
        let summary =
            analyzer.analyze("0xtoken", &ledger, None, &HashSet::new(), 18, 0.0, None);

        assert!((summary.burn_percent - 25.0).abs() < 1e-6);
    }
}
