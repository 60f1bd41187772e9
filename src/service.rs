/// Analytics service: orchestration of the two derived views
///
/// Request flow for both paths: validate input, check the summary cache, take
/// the per-key recompute lock, crawl, compute, cache (complete results only),
/// release the lock via RAII on every exit path. Lock contention is a
/// defined NotReady outcome for the caller to retry, never an error.

use crate::apis::client::RateLimiter;
use crate::apis::explorer::{ExplorerApi, ExplorerClient};
use crate::apis::price::{PriceClient, PriceOracle};
use crate::cache::{CacheConfig, CacheManager, RecomputeLock};
use crate::config::{normalize_address, Configs};
use crate::crawler::{CrawlerConfig, EventCrawler};
use crate::distribution::{AnalyzerConfig, DistributionAnalyzer, DistributionSummary};
use crate::errors::{ScopeError, ScopeResult};
use crate::logger::{self, LogTag};
use crate::pnl::{AccountantConfig, PositionAccountant, WalletPnlSummary};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Bumped whenever a summary document's shape changes so stale cache entries
/// from an older build are never served
pub const SUMMARY_SCHEMA_VERSION: &str = "v2";

/// Outcome of a summary request
#[derive(Debug, Clone)]
pub enum ComputeOutcome<T> {
    Ready(T),
    /// Another request holds the recompute lock for this key
    NotReady,
}

pub struct AnalyticsService {
    configs: Configs,
    explorer: Arc<dyn ExplorerApi>,
    oracle: Arc<dyn PriceOracle>,
    crawler: EventCrawler,
    accountant: PositionAccountant,
    analyzer: DistributionAnalyzer,
    dist_cache: CacheManager<String, DistributionSummary>,
    pnl_cache: CacheManager<String, WalletPnlSummary>,
    lock: Arc<RecomputeLock>,
}

impl AnalyticsService {
    /// Wire the service against injected upstream clients (tests inject
    /// scripted ones)
    pub fn new(
        configs: Configs,
        explorer: Arc<dyn ExplorerApi>,
        oracle: Arc<dyn PriceOracle>,
    ) -> Self {
        let crawler = EventCrawler::new(explorer.clone(), CrawlerConfig::from_configs(&configs));
        let accountant =
            PositionAccountant::new(AccountantConfig::from_configs(&configs), oracle.clone());
        let analyzer = DistributionAnalyzer::new(AnalyzerConfig::default());
        let summary_ttl = configs.summary_ttl_secs;
        let lock = RecomputeLock::new(Duration::from_secs(configs.lock_ttl_secs));

        Self {
            configs,
            explorer,
            oracle,
            crawler,
            accountant,
            analyzer,
            dist_cache: CacheManager::new(CacheConfig::custom(summary_ttl, 500)),
            pnl_cache: CacheManager::new(CacheConfig::custom(summary_ttl, 500)),
            lock,
        }
    }

    /// Build the service with real HTTP clients sharing one process-wide
    /// rate limiter
    pub fn from_configs(configs: Configs) -> Result<Self, String> {
        let limiter = Arc::new(RateLimiter::new(configs.requests_per_second));

        let explorer = ExplorerClient::new(
            &configs.explorer_url,
            &configs.explorer_api_key,
            limiter.clone(),
            configs.request_timeout_secs,
        )?;
        let oracle = PriceClient::new(
            &configs.price_api_url,
            limiter,
            true,
            configs.request_timeout_secs,
        )?;

        Ok(Self::new(configs, Arc::new(explorer), Arc::new(oracle)))
    }

    /// Token distribution path: crawl the token's full Transfer history,
    /// rebuild the ledger, derive the concentration summary.
    pub async fn token_distribution(
        &self,
        token: &str,
        token_decimals: u8,
    ) -> ScopeResult<ComputeOutcome<DistributionSummary>> {
        let token = normalize_address(token)?;
        let key = format!("dist:{}:{}", SUMMARY_SCHEMA_VERSION, token);

        if let Some(cached) = self.dist_cache.get(&key) {
            logger::debug(LogTag::Service, &format!("cache hit for {}", key));
            return Ok(ComputeOutcome::Ready(cached));
        }

        let Some(_guard) = self.lock.acquire(&key) else {
            return Ok(ComputeOutcome::NotReady);
        };

        let from_block = match self.explorer.contract_creation(&token).await {
            Ok(Some(creation)) => creation
                .block_number
                .as_deref()
                .and_then(|b| crate::apis::explorer::parse_u64(b).ok())
                .unwrap_or(0),
            Ok(None) => {
                // No creator found: documented fallback is a genesis-anchored crawl
                logger::warning(
                    LogTag::Service,
                    &format!("{}: no contract creation info, crawling from block 0", token),
                );
                0
            }
            Err(e) => {
                logger::warning(
                    LogTag::Service,
                    &format!("{}: contract creation lookup failed ({}), crawling from block 0", token, e),
                );
                0
            }
        };

        let to_block = self
            .explorer
            .block_by_timestamp(Utc::now().timestamp())
            .await
            .map_err(|e| {
                logger::error(
                    LogTag::Service,
                    &format!("{}: cannot resolve head block: {}", token, e),
                );
                ScopeError::NoBlockRange {
                    subject: token.clone(),
                }
            })?;

        let crawl = self
            .crawler
            .fetch_transfer_logs(&token, from_block, to_block, token_decimals)
            .await?;

        let ledger = crate::ledger::build_ledger(&crawl.events);

        // Supply fallback chain: explorer total supply, else inferred from
        // the ledger inside the analyzer
        let total_supply = match self.explorer.total_supply(&token).await {
            Ok(supply) => supply,
            Err(e) => {
                logger::warning(
                    LogTag::Service,
                    &format!("{}: total supply lookup failed ({}), inferring from ledger", token, e),
                );
                None
            }
        };

        let quote = match self.oracle.spot_price(&token).await {
            Ok(q) => q,
            Err(e) => {
                logger::warning(
                    LogTag::Service,
                    &format!("{}: spot price failed ({}), value bands degrade to zero", token, e),
                );
                crate::apis::price::SpotPrice::unknown()
            }
        };

        // The token's own address holds bonding-curve inventory, never a holder
        let mut excluded: HashSet<String> = self
            .configs
            .liquidity_pool_addresses
            .iter()
            .map(|a| a.to_lowercase())
            .collect();
        excluded.insert(token.clone());

        let summary = self.analyzer.analyze(
            &token,
            &ledger,
            total_supply,
            &excluded,
            token_decimals,
            quote.price_usd,
            quote.market_cap_usd,
        );

        if crawl.complete {
            self.dist_cache.insert(key, summary.clone());
        } else {
            logger::warning(
                LogTag::Service,
                &format!("{}: partial crawl, summary served uncached", token),
            );
        }

        Ok(ComputeOutcome::Ready(summary))
    }

    /// Wallet PnL path: pull account history from the given timestamp and
    /// run the position accountant over it.
    pub async fn wallet_pnl(
        &self,
        wallet: &str,
        from_timestamp: i64,
    ) -> ScopeResult<ComputeOutcome<WalletPnlSummary>> {
        let wallet = normalize_address(wallet)?;
        let key = format!("pnl:{}:{}:{}", SUMMARY_SCHEMA_VERSION, wallet, from_timestamp);

        if let Some(cached) = self.pnl_cache.get(&key) {
            logger::debug(LogTag::Service, &format!("cache hit for {}", key));
            return Ok(ComputeOutcome::Ready(cached));
        }

        let Some(_guard) = self.lock.acquire(&key) else {
            return Ok(ComputeOutcome::NotReady);
        };

        let start_block = if from_timestamp <= 0 {
            0
        } else {
            match self.explorer.block_by_timestamp(from_timestamp).await {
                Ok(block) => block,
                Err(e) => {
                    logger::warning(
                        LogTag::Service,
                        &format!(
                            "{}: block-by-timestamp failed ({}), pulling full history",
                            wallet, e
                        ),
                    );
                    0
                }
            }
        };

        let history = self.crawler.fetch_account_history(&wallet, start_block).await?;
        let summary = self.accountant.compute(&wallet, &history).await?;

        if summary.complete {
            self.pnl_cache.insert(key, summary.clone());
        } else {
            logger::warning(
                LogTag::Service,
                &format!("{}: partial history, summary served uncached", wallet),
            );
        }

        Ok(ComputeOutcome::Ready(summary))
    }

    pub fn configs(&self) -> &Configs {
        &self.configs
    }
}
