/// Cache configuration per entity type
///
/// TTLs tuned per artifact: summary documents are expensive to recompute and
/// tolerate short staleness, spot prices go stale fast.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Time-to-live for cached entries
    pub ttl: Duration,

    /// Maximum number of entries (LRU eviction when exceeded)
    pub capacity: usize,
}

impl CacheConfig {
    /// Token distribution summaries (full crawl + replay behind each one)
    pub fn distribution_summary() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            capacity: 500,
        }
    }

    /// Wallet PnL summaries
    pub fn wallet_summary() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            capacity: 500,
        }
    }

    /// Spot price quotes
    pub fn spot_price() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            capacity: 2000,
        }
    }

    /// Custom configuration
    pub fn custom(ttl_secs: u64, capacity: usize) -> Self {
        Self {
            ttl: Duration::from_secs(ttl_secs),
            capacity,
        }
    }
}
