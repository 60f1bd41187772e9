use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Burn/zero sentinels excluded from balance tracking. Transfers to these
/// credit the burned counter instead of a holder balance.
pub const BURN_SENTINELS: &[&str] = &[
    "0x0000000000000000000000000000000000000000",
    "0x000000000000000000000000000000000000dead",
];

/// Runtime configuration loaded from configs.json
///
/// Every tunable the engine uses lives here so deployments can adjust
/// crawl sizing, thresholds, and address sets without a rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Configs {
    /// Explorer API base URL (Etherscan-compatible REST)
    pub explorer_url: String,
    pub explorer_api_key: String,

    /// Price oracle base URL
    pub price_api_url: String,

    /// Upstream request budget shared by all requests in the process
    pub requests_per_second: u32,
    pub request_timeout_secs: u64,

    /// Log crawl window sizing
    pub log_window_blocks: u64,
    pub min_window_blocks: u64,
    pub max_windows_per_crawl: usize,

    /// Page sizes for paginated endpoints
    pub log_page_size: usize,
    pub history_page_size: usize,
    pub max_history_pages: usize,

    /// Retry policy for transient upstream failures
    pub max_retries: u32,
    pub retry_backoff_ms: u64,

    /// Blocks searched on each side of a transaction for settlement flow
    pub near_block_window: u64,

    /// Positions below these thresholds are excluded from open-position views
    pub dust_token_units: f64,
    pub dust_usd: f64,

    /// Recompute lock TTL (self-healing if the holder crashes)
    pub lock_ttl_secs: u64,

    /// TTL for cached summary documents
    pub summary_ttl_secs: u64,

    /// Wrapped-native token contract, netted with native flows
    pub wrapped_native_address: String,

    /// Known router/forwarder contracts (settlement intermediaries)
    pub router_addresses: HashSet<String>,

    /// Liquidity-pool addresses excluded from holder analytics
    pub liquidity_pool_addresses: HashSet<String>,
}

impl Default for Configs {
    fn default() -> Self {
        Self {
            explorer_url: "https://api.etherscan.io/api".to_string(),
            explorer_api_key: String::new(),
            price_api_url: "https://api.dexscreener.com".to_string(),
            requests_per_second: 5,
            request_timeout_secs: 10,
            log_window_blocks: 200_000,
            min_window_blocks: 10_000,
            max_windows_per_crawl: 250,
            log_page_size: 1000,
            history_page_size: 1000,
            max_history_pages: 10,
            max_retries: 3,
            retry_backoff_ms: 400,
            near_block_window: 2,
            dust_token_units: 5.0,
            dust_usd: 1.0,
            lock_ttl_secs: 120,
            summary_ttl_secs: 300,
            wrapped_native_address: "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2".to_string(),
            router_addresses: HashSet::new(),
            liquidity_pool_addresses: HashSet::new(),
        }
    }
}

/// Reads configs.json from the given path and returns a Configs object
pub fn read_configs<P: AsRef<Path>>(path: P) -> Result<Configs, Box<dyn std::error::Error>> {
    let data = fs::read_to_string(path)?;
    let configs: Configs = serde_json::from_str(&data)?;
    Ok(configs)
}

/// Normalize an EVM address to lowercase hex, rejecting malformed input
pub fn normalize_address(address: &str) -> Result<String, crate::errors::ScopeError> {
    let addr = address.trim().to_lowercase();
    let hex = addr.strip_prefix("0x").unwrap_or(&addr);
    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(crate::errors::ScopeError::InvalidAddress {
            address: address.to_string(),
        });
    }
    Ok(format!("0x{}", hex))
}

/// Check whether an address is a burn/zero sentinel
pub fn is_burn_sentinel(address: &str) -> bool {
    BURN_SENTINELS.iter().any(|s| s.eq_ignore_ascii_case(address))
}
