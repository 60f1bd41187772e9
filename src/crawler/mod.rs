/// Event and account-history crawler
///
/// Pulls Transfer logs in fixed block windows with page/offset pagination
/// inside each window. Transient page failures retry with linear backoff and
/// then abandon only their window; a range-too-large response halves the
/// window (down to a floor) and re-crawls the same sub-range so nothing
/// before the shrink point is lost. A hard cap on windows bounds worst-case
/// crawl time; hitting it truncates the result and marks it incomplete.

use crate::apis::explorer::{parse_u64, parse_uint, ExplorerApi, RawTxRecord};
use crate::errors::{ScopeError, ScopeResult};
use crate::ledger::TransferEvent;
use crate::logger::{self, LogTag};
use crate::utils::retry::{retry_with_backoff, RetryPolicy};
use num_bigint::BigUint;
use std::sync::Arc;

/// Crawl sizing and retry knobs, normally derived from [`crate::config::Configs`]
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub window_blocks: u64,
    pub min_window_blocks: u64,
    pub max_windows: usize,
    pub log_page_size: usize,
    pub history_page_size: usize,
    pub max_history_pages: usize,
    pub retry: RetryPolicy,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            window_blocks: 200_000,
            min_window_blocks: 10_000,
            max_windows: 250,
            log_page_size: 1000,
            history_page_size: 1000,
            max_history_pages: 10,
            retry: RetryPolicy::default(),
        }
    }
}

impl CrawlerConfig {
    pub fn from_configs(configs: &crate::config::Configs) -> Self {
        Self {
            window_blocks: configs.log_window_blocks,
            min_window_blocks: configs.min_window_blocks,
            max_windows: configs.max_windows_per_crawl,
            log_page_size: configs.log_page_size,
            history_page_size: configs.history_page_size,
            max_history_pages: configs.max_history_pages,
            retry: RetryPolicy::new(
                configs.max_retries,
                configs.retry_backoff_ms,
                configs.request_timeout_secs + 5,
            ),
        }
    }
}

/// Result of a log crawl. `complete` is false when any window was abandoned
/// or the window cap truncated the range; incomplete results are never cached.
#[derive(Debug, Clone)]
pub struct CrawlResult {
    pub events: Vec<TransferEvent>,
    pub complete: bool,
    pub windows_processed: usize,
}

/// One native-asset transfer from the wallet's transaction list
#[derive(Debug, Clone)]
pub struct NativeTransfer {
    pub hash: String,
    pub block_number: u64,
    pub timestamp: i64,
    pub from: String,
    pub to: String,
    pub value_wei: BigUint,
    pub failed: bool,
}

/// One ERC-20 transfer touching the wallet
#[derive(Debug, Clone)]
pub struct Erc20Transfer {
    pub hash: String,
    pub block_number: u64,
    pub timestamp: i64,
    pub from: String,
    pub to: String,
    pub contract: String,
    pub value_raw: BigUint,
    pub decimals: u8,
    pub symbol: String,
}

/// One NFT transfer touching the wallet
#[derive(Debug, Clone)]
pub struct NftTransfer {
    pub hash: String,
    pub block_number: u64,
    pub timestamp: i64,
    pub from: String,
    pub to: String,
    pub contract: String,
    pub token_id: String,
    pub collection: String,
}

/// A wallet's full fetched history across the three transfer families
#[derive(Debug, Clone, Default)]
pub struct AccountHistory {
    pub native: Vec<NativeTransfer>,
    pub erc20: Vec<Erc20Transfer>,
    pub nft: Vec<NftTransfer>,
    pub complete: bool,
}

pub struct EventCrawler {
    explorer: Arc<dyn ExplorerApi>,
    config: CrawlerConfig,
}

impl EventCrawler {
    pub fn new(explorer: Arc<dyn ExplorerApi>, config: CrawlerConfig) -> Self {
        Self { explorer, config }
    }

    /// Crawl Transfer logs for `token` across [from_block, to_block].
    pub async fn fetch_transfer_logs(
        &self,
        token: &str,
        from_block: u64,
        to_block: u64,
        token_decimals: u8,
    ) -> ScopeResult<CrawlResult> {
        if from_block > to_block {
            return Err(ScopeError::NoBlockRange {
                subject: token.to_string(),
            });
        }

        let mut events: Vec<TransferEvent> = Vec::new();
        let mut cursor = from_block;
        let mut window = self.config.window_blocks.max(1);
        let mut windows_processed = 0usize;
        let mut complete = true;

        while cursor <= to_block {
            if windows_processed >= self.config.max_windows {
                logger::warning(
                    LogTag::Crawler,
                    &format!(
                        "{}: window cap {} reached at block {}, truncating crawl",
                        token, self.config.max_windows, cursor
                    ),
                );
                complete = false;
                break;
            }

            let window_end = cursor.saturating_add(window - 1).min(to_block);

            match self.crawl_window(token, cursor, window_end, token_decimals).await {
                Ok(mut window_events) => {
                    events.append(&mut window_events);
                    cursor = window_end + 1;
                    windows_processed += 1;
                }
                Err(err) if err.is_range_too_large() => {
                    if window / 2 >= self.config.min_window_blocks {
                        window /= 2;
                        logger::info(
                            LogTag::Crawler,
                            &format!(
                                "{}: range {}-{} too large, shrinking window to {} blocks",
                                token, cursor, window_end, window
                            ),
                        );
                        // Same sub-range retried at the smaller size
                        continue;
                    }
                    logger::warning(
                        LogTag::Crawler,
                        &format!(
                            "{}: range {}-{} too large at floor window {}, abandoning window",
                            token, cursor, window_end, window
                        ),
                    );
                    complete = false;
                    cursor = window_end + 1;
                    windows_processed += 1;
                }
                Err(err) => {
                    // Transient failure survived its retries: degrade to a
                    // partial crawl instead of aborting the computation
                    logger::warning(
                        LogTag::Crawler,
                        &format!(
                            "{}: window {}-{} failed ({}), continuing with partial data",
                            token, cursor, window_end, err
                        ),
                    );
                    complete = false;
                    cursor = window_end + 1;
                    windows_processed += 1;
                }
            }
        }

        events.sort_by_key(|e| e.ordering_key());
        events.dedup_by_key(|e| (e.block_number, e.log_index));

        logger::info(
            LogTag::Crawler,
            &format!(
                "{}: crawled {} events over {} windows (complete={})",
                token,
                events.len(),
                windows_processed,
                complete
            ),
        );

        Ok(CrawlResult {
            events,
            complete,
            windows_processed,
        })
    }

    /// Paginate one block window until a short page signals the end.
    /// Range-too-large propagates to the caller for the adaptive shrink.
    async fn crawl_window(
        &self,
        token: &str,
        from_block: u64,
        to_block: u64,
        token_decimals: u8,
    ) -> ScopeResult<Vec<TransferEvent>> {
        let mut events = Vec::new();
        let mut page = 1usize;

        loop {
            let raw_page = retry_with_backoff(&self.config.retry, "logs.getLogs", || {
                self.explorer
                    .transfer_log_page(token, from_block, to_block, page, self.config.log_page_size)
            })
            .await
            .map_err(|e| match e {
                // Attach the real range so shrink logging is meaningful
                ScopeError::RangeTooLarge { .. } => ScopeError::RangeTooLarge {
                    from_block,
                    to_block,
                },
                other => other,
            })?;

            let page_len = raw_page.len();
            for raw in &raw_page {
                match TransferEvent::from_log_entry(raw, token_decimals) {
                    Ok(event) => events.push(event),
                    Err(e) => logger::warning(
                        LogTag::Crawler,
                        &format!("{}: skipping undecodable log in {}: {}", token, raw.transaction_hash, e),
                    ),
                }
            }

            if page_len < self.config.log_page_size {
                break;
            }
            page += 1;
        }

        Ok(events)
    }

    /// Pull a wallet's native, ERC-20, and NFT transfer history from
    /// `start_block` onward. Ascending sort, fixed page size, stop on a
    /// short page or the page ceiling.
    pub async fn fetch_account_history(
        &self,
        wallet: &str,
        start_block: u64,
    ) -> ScopeResult<AccountHistory> {
        let mut history = AccountHistory {
            complete: true,
            ..Default::default()
        };

        let native_raw = self
            .fetch_history_pages("account.txlist", |page| {
                self.explorer
                    .native_tx_page(wallet, start_block, page, self.config.history_page_size)
            })
            .await?;
        history.complete &= native_raw.complete;
        for raw in &native_raw.records {
            match decode_native(raw) {
                Ok(t) => history.native.push(t),
                Err(e) => logger::warning(
                    LogTag::Crawler,
                    &format!("{}: skipping undecodable native tx {}: {}", wallet, raw.hash, e),
                ),
            }
        }

        let erc20_raw = self
            .fetch_history_pages("account.tokentx", |page| {
                self.explorer
                    .erc20_tx_page(wallet, start_block, page, self.config.history_page_size)
            })
            .await?;
        history.complete &= erc20_raw.complete;
        for raw in &erc20_raw.records {
            match decode_erc20(raw) {
                Ok(t) => history.erc20.push(t),
                Err(e) => logger::warning(
                    LogTag::Crawler,
                    &format!("{}: skipping undecodable token tx {}: {}", wallet, raw.hash, e),
                ),
            }
        }

        let nft_raw = self
            .fetch_history_pages("account.tokennfttx", |page| {
                self.explorer
                    .nft_tx_page(wallet, start_block, page, self.config.history_page_size)
            })
            .await?;
        history.complete &= nft_raw.complete;
        for raw in &nft_raw.records {
            match decode_nft(raw) {
                Ok(t) => history.nft.push(t),
                Err(e) => logger::warning(
                    LogTag::Crawler,
                    &format!("{}: skipping undecodable NFT tx {}: {}", wallet, raw.hash, e),
                ),
            }
        }

        logger::info(
            LogTag::Crawler,
            &format!(
                "{}: history fetched ({} native, {} erc20, {} nft, complete={})",
                wallet,
                history.native.len(),
                history.erc20.len(),
                history.nft.len(),
                history.complete
            ),
        );

        Ok(history)
    }

    async fn fetch_history_pages<F, Fut>(
        &self,
        endpoint: &str,
        fetch: F,
    ) -> ScopeResult<HistoryPages>
    where
        F: Fn(usize) -> Fut,
        Fut: std::future::Future<Output = ScopeResult<Vec<RawTxRecord>>>,
    {
        let mut records = Vec::new();
        let mut complete = true;
        let mut page = 1usize;

        loop {
            if page > self.config.max_history_pages {
                logger::warning(
                    LogTag::Crawler,
                    &format!("{}: page ceiling {} reached, truncating history", endpoint, self.config.max_history_pages),
                );
                complete = false;
                break;
            }

            let batch = retry_with_backoff(&self.config.retry, endpoint, || fetch(page)).await?;
            let batch_len = batch.len();
            records.extend(batch);

            if batch_len < self.config.history_page_size {
                break;
            }
            page += 1;
        }

        Ok(HistoryPages { records, complete })
    }
}

struct HistoryPages {
    records: Vec<RawTxRecord>,
    complete: bool,
}

fn decode_native(raw: &RawTxRecord) -> ScopeResult<NativeTransfer> {
    Ok(NativeTransfer {
        hash: raw.hash.clone(),
        block_number: parse_u64(&raw.block_number)?,
        timestamp: parse_u64(&raw.time_stamp)? as i64,
        from: raw.from.to_lowercase(),
        to: raw.to.to_lowercase(),
        value_wei: parse_uint(raw.value.as_deref().unwrap_or("0"))?,
        failed: raw.failed(),
    })
}

fn decode_erc20(raw: &RawTxRecord) -> ScopeResult<Erc20Transfer> {
    Ok(Erc20Transfer {
        hash: raw.hash.clone(),
        block_number: parse_u64(&raw.block_number)?,
        timestamp: parse_u64(&raw.time_stamp)? as i64,
        from: raw.from.to_lowercase(),
        to: raw.to.to_lowercase(),
        contract: raw
            .contract_address
            .as_deref()
            .unwrap_or_default()
            .to_lowercase(),
        value_raw: parse_uint(raw.value.as_deref().unwrap_or("0"))?,
        decimals: raw
            .token_decimal
            .as_deref()
            .and_then(|d| d.parse::<u8>().ok())
            .unwrap_or(18),
        symbol: raw.token_symbol.clone().unwrap_or_default(),
    })
}

fn decode_nft(raw: &RawTxRecord) -> ScopeResult<NftTransfer> {
    Ok(NftTransfer {
        hash: raw.hash.clone(),
        block_number: parse_u64(&raw.block_number)?,
        timestamp: parse_u64(&raw.time_stamp)? as i64,
        from: raw.from.to_lowercase(),
        to: raw.to.to_lowercase(),
        contract: raw
            .contract_address
            .as_deref()
            .unwrap_or_default()
            .to_lowercase(),
        token_id: raw.token_id.clone().unwrap_or_default(),
        collection: raw.token_name.clone().unwrap_or_default(),
    })
}
