/// Explorer API client (Etherscan-compatible REST)
///
/// Endpoints implemented:
/// 1. module=logs&action=getLogs            - windowed Transfer log pages
/// 2. module=account&action=txlist          - native transaction history
/// 3. module=account&action=tokentx         - ERC-20 transfer history
/// 4. module=account&action=tokennfttx      - NFT transfer history
/// 5. module=contract&action=getcontractcreation
/// 6. module=stats&action=tokensupply
/// 7. module=block&action=getblocknobytime
///
/// All calls go through the injected process-wide RateLimiter. Upstream
/// "result window too large" responses are surfaced as RangeTooLarge so the
/// crawler can shrink its block window instead of retrying blindly.
pub mod types;

pub use self::types::{
    parse_u64, parse_uint, topic_to_address, ContractCreation, RawLogEntry, RawResponse,
    RawTxRecord,
};

use crate::apis::client::{HttpClient, RateLimiter};
use crate::apis::stats::{ApiStats, ApiStatsTracker};
use crate::errors::{ScopeError, ScopeResult};
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use num_bigint::BigUint;
use std::sync::Arc;
use std::time::Instant;

/// keccak256("Transfer(address,address,uint256)")
pub const TRANSFER_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a1c6f9f3b3ef";

/// Request timeout in seconds
pub const TIMEOUT_SECS: u64 = 10;

/// Narrow contract consumed by the crawler and service layers.
///
/// Kept as a trait so tests drive the crawler with a scripted explorer
/// instead of the network.
#[async_trait]
pub trait ExplorerApi: Send + Sync {
    async fn transfer_log_page(
        &self,
        token: &str,
        from_block: u64,
        to_block: u64,
        page: usize,
        offset: usize,
    ) -> ScopeResult<Vec<RawLogEntry>>;

    async fn native_tx_page(
        &self,
        address: &str,
        start_block: u64,
        page: usize,
        offset: usize,
    ) -> ScopeResult<Vec<RawTxRecord>>;

    async fn erc20_tx_page(
        &self,
        address: &str,
        start_block: u64,
        page: usize,
        offset: usize,
    ) -> ScopeResult<Vec<RawTxRecord>>;

    async fn nft_tx_page(
        &self,
        address: &str,
        start_block: u64,
        page: usize,
        offset: usize,
    ) -> ScopeResult<Vec<RawTxRecord>>;

    async fn contract_creation(&self, address: &str) -> ScopeResult<Option<ContractCreation>>;

    async fn total_supply(&self, token: &str) -> ScopeResult<Option<BigUint>>;

    async fn block_by_timestamp(&self, timestamp: i64) -> ScopeResult<u64>;
}

/// Concrete HTTP client for the explorer API
pub struct ExplorerClient {
    http: HttpClient,
    stats: Arc<ApiStatsTracker>,
    limiter: Arc<RateLimiter>,
    base_url: String,
    api_key: String,
}

impl ExplorerClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        limiter: Arc<RateLimiter>,
        timeout_seconds: u64,
    ) -> Result<Self, String> {
        Ok(Self {
            http: HttpClient::new(timeout_seconds)?,
            stats: Arc::new(ApiStatsTracker::new()),
            limiter,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub async fn get_stats(&self) -> ApiStats {
        self.stats.get_stats().await
    }

    /// Execute one GET with rate limiting, stats recording, and error
    /// classification. `params` are appended to the query string.
    async fn get_envelope(&self, endpoint: &str, params: &[(&str, String)]) -> ScopeResult<RawResponse> {
        let guard = self
            .limiter
            .acquire()
            .await
            .map_err(|e| ScopeError::Unknown(format!("Rate limiter error: {}", e)))?;

        let mut builder = self.http.client().get(&self.base_url).timeout(self.http.timeout());
        for (key, value) in params {
            builder = builder.query(&[(*key, value.as_str())]);
        }
        if !self.api_key.is_empty() {
            builder = builder.query(&[("apikey", self.api_key.as_str())]);
        }

        let start = Instant::now();
        let response_result = builder.send().await;
        drop(guard);
        let elapsed = start.elapsed().as_millis() as f64;

        let response = match response_result {
            Ok(r) => r,
            Err(err) => {
                self.stats.record_request(false, elapsed).await;
                self.stats
                    .record_error("Explorer", endpoint, format!("Request failed: {}", err))
                    .await;
                return Err(ScopeError::from(err));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            self.stats.record_request(false, elapsed).await;
            self.stats
                .record_error("Explorer", endpoint, format!("HTTP {}: {}", status, body))
                .await;
            if status.as_u16() == 400 && looks_like_range_error(&body) {
                return Err(ScopeError::RangeTooLarge { from_block: 0, to_block: 0 });
            }
            return Err(ScopeError::Http {
                status: status.as_u16(),
                body,
            });
        }

        match response.json::<RawResponse>().await {
            Ok(envelope) => {
                self.stats.record_request(true, elapsed).await;
                Ok(envelope)
            }
            Err(err) => {
                self.stats.record_request(false, elapsed).await;
                self.stats
                    .record_error("Explorer", endpoint, format!("Parse error: {}", err))
                    .await;
                Err(ScopeError::Parse(format!("Explorer response: {}", err)))
            }
        }
    }

    /// Dispatch on the envelope status field. Status "0" with an empty-result
    /// message is a normal end-of-data signal, not an error.
    fn unwrap_list<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        envelope: RawResponse,
        from_block: u64,
        to_block: u64,
    ) -> ScopeResult<Vec<T>> {
        let message = envelope.message.unwrap_or_default();

        if envelope.status.as_deref() == Some("0") {
            let lowered = message.to_lowercase();
            if lowered.contains("no records found") || lowered.contains("no transactions found") {
                return Ok(Vec::new());
            }
            let result_text = envelope.result.as_str().unwrap_or_default().to_string();
            if looks_like_range_error(&message) || looks_like_range_error(&result_text) {
                return Err(ScopeError::RangeTooLarge { from_block, to_block });
            }
            if lowered.contains("rate limit") || result_text.to_lowercase().contains("rate limit") {
                return Err(ScopeError::RateLimit {
                    service: "explorer".to_string(),
                });
            }
            logger::debug(
                LogTag::Explorer,
                &format!("{}: status 0: {} {}", endpoint, message, result_text),
            );
            return Err(ScopeError::Explorer(format!("{}: {}", message, result_text)));
        }

        serde_json::from_value(envelope.result)
            .map_err(|e| ScopeError::Parse(format!("{} result: {}", endpoint, e)))
    }
}

/// Upstream phrasing for "this block window matched too much data"
fn looks_like_range_error(text: &str) -> bool {
    let lowered = text.to_lowercase();
    lowered.contains("window is too large")
        || lowered.contains("result window is too large")
        || lowered.contains("range too large")
        || lowered.contains("returned more than")
}

#[async_trait]
impl ExplorerApi for ExplorerClient {
    async fn transfer_log_page(
        &self,
        token: &str,
        from_block: u64,
        to_block: u64,
        page: usize,
        offset: usize,
    ) -> ScopeResult<Vec<RawLogEntry>> {
        let endpoint = "logs.getLogs";
        let envelope = self
            .get_envelope(
                endpoint,
                &[
                    ("module", "logs".to_string()),
                    ("action", "getLogs".to_string()),
                    ("address", token.to_string()),
                    ("topic0", TRANSFER_TOPIC.to_string()),
                    ("fromBlock", from_block.to_string()),
                    ("toBlock", to_block.to_string()),
                    ("page", page.to_string()),
                    ("offset", offset.to_string()),
                ],
            )
            .await?;
        self.unwrap_list(endpoint, envelope, from_block, to_block)
    }

    async fn native_tx_page(
        &self,
        address: &str,
        start_block: u64,
        page: usize,
        offset: usize,
    ) -> ScopeResult<Vec<RawTxRecord>> {
        let endpoint = "account.txlist";
        let envelope = self
            .get_envelope(
                endpoint,
                &[
                    ("module", "account".to_string()),
                    ("action", "txlist".to_string()),
                    ("address", address.to_string()),
                    ("startblock", start_block.to_string()),
                    ("page", page.to_string()),
                    ("offset", offset.to_string()),
                    ("sort", "asc".to_string()),
                ],
            )
            .await?;
        self.unwrap_list(endpoint, envelope, start_block, 0)
    }

    async fn erc20_tx_page(
        &self,
        address: &str,
        start_block: u64,
        page: usize,
        offset: usize,
    ) -> ScopeResult<Vec<RawTxRecord>> {
        let endpoint = "account.tokentx";
        let envelope = self
            .get_envelope(
                endpoint,
                &[
                    ("module", "account".to_string()),
                    ("action", "tokentx".to_string()),
                    ("address", address.to_string()),
                    ("startblock", start_block.to_string()),
                    ("page", page.to_string()),
                    ("offset", offset.to_string()),
                    ("sort", "asc".to_string()),
                ],
            )
            .await?;
        self.unwrap_list(endpoint, envelope, start_block, 0)
    }

    async fn nft_tx_page(
        &self,
        address: &str,
        start_block: u64,
        page: usize,
        offset: usize,
    ) -> ScopeResult<Vec<RawTxRecord>> {
        let endpoint = "account.tokennfttx";
        let envelope = self
            .get_envelope(
                endpoint,
                &[
                    ("module", "account".to_string()),
                    ("action", "tokennfttx".to_string()),
                    ("address", address.to_string()),
                    ("startblock", start_block.to_string()),
                    ("page", page.to_string()),
                    ("offset", offset.to_string()),
                    ("sort", "asc".to_string()),
                ],
            )
            .await?;
        self.unwrap_list(endpoint, envelope, start_block, 0)
    }

    async fn contract_creation(&self, address: &str) -> ScopeResult<Option<ContractCreation>> {
        let endpoint = "contract.getcontractcreation";
        let envelope = self
            .get_envelope(
                endpoint,
                &[
                    ("module", "contract".to_string()),
                    ("action", "getcontractcreation".to_string()),
                    ("contractaddresses", address.to_string()),
                ],
            )
            .await?;

        // Missing creator is a documented fallback case, not a failure
        if envelope.status.as_deref() == Some("0") {
            return Ok(None);
        }
        let mut creations: Vec<ContractCreation> = serde_json::from_value(envelope.result)
            .map_err(|e| ScopeError::Parse(format!("{} result: {}", endpoint, e)))?;
        let result = creations.drain(..).next();
        Ok(result)
    }

    async fn total_supply(&self, token: &str) -> ScopeResult<Option<BigUint>> {
        let endpoint = "stats.tokensupply";
        let envelope = self
            .get_envelope(
                endpoint,
                &[
                    ("module", "stats".to_string()),
                    ("action", "tokensupply".to_string()),
                    ("contractaddress", token.to_string()),
                ],
            )
            .await?;

        if envelope.status.as_deref() == Some("0") {
            return Ok(None);
        }
        let raw = envelope
            .result
            .as_str()
            .ok_or_else(|| ScopeError::Parse("tokensupply: non-string result".to_string()))?;
        Ok(Some(parse_uint(raw)?))
    }

    async fn block_by_timestamp(&self, timestamp: i64) -> ScopeResult<u64> {
        let endpoint = "block.getblocknobytime";
        let envelope = self
            .get_envelope(
                endpoint,
                &[
                    ("module", "block".to_string()),
                    ("action", "getblocknobytime".to_string()),
                    ("timestamp", timestamp.to_string()),
                    ("closest", "before".to_string()),
                ],
            )
            .await?;

        if envelope.status.as_deref() == Some("0") {
            return Err(ScopeError::Explorer(format!(
                "no block for timestamp {}",
                timestamp
            )));
        }
        let raw = envelope
            .result
            .as_str()
            .ok_or_else(|| ScopeError::Parse("getblocknobytime: non-string result".to_string()))?;
        parse_u64(raw)
    }
}
