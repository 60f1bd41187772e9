/// Spot price oracle client
///
/// Best-effort by contract: the upstream aggregator may not know a token at
/// all, and PnL marking must keep going with a zero quote. Callers treat
/// an unknown price as "value unknown", never as an abort.
use crate::apis::client::{HttpClient, RateLimiter};
use crate::apis::stats::{ApiStats, ApiStatsTracker};
use crate::errors::{ScopeError, ScopeResult};
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

/// Chain slug used on the aggregator
const DEFAULT_CHAIN_ID: &str = "ethereum";

pub const TIMEOUT_SECS: u64 = 10;

/// Spot quote for one token
#[derive(Debug, Clone, Default)]
pub struct SpotPrice {
    /// Price in the chain's base asset (native units per whole token)
    pub price_native: f64,
    /// Price in USD
    pub price_usd: f64,
    /// Market cap in USD when the aggregator reports one
    pub market_cap_usd: Option<f64>,
}

impl SpotPrice {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_known(&self) -> bool {
        self.price_native > 0.0 || self.price_usd > 0.0
    }
}

/// Price lookup abstraction so the accountant can be tested with fixed quotes
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn spot_price(&self, token: &str) -> ScopeResult<SpotPrice>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPair {
    #[serde(default)]
    price_native: Option<String>,
    #[serde(default)]
    price_usd: Option<String>,
    #[serde(default)]
    market_cap: Option<f64>,
    #[serde(default)]
    fdv: Option<f64>,
}

/// HTTP client against a DexScreener-style pair aggregator
pub struct PriceClient {
    http: HttpClient,
    stats: Arc<ApiStatsTracker>,
    limiter: Arc<RateLimiter>,
    base_url: String,
    enabled: bool,
}

impl PriceClient {
    pub fn new(
        base_url: &str,
        limiter: Arc<RateLimiter>,
        enabled: bool,
        timeout_seconds: u64,
    ) -> Result<Self, String> {
        Ok(Self {
            http: HttpClient::new(timeout_seconds)?,
            stats: Arc::new(ApiStatsTracker::new()),
            limiter,
            base_url: base_url.trim_end_matches('/').to_string(),
            enabled,
        })
    }

    pub async fn get_stats(&self) -> ApiStats {
        self.stats.get_stats().await
    }
}

#[async_trait]
impl PriceOracle for PriceClient {
    async fn spot_price(&self, token: &str) -> ScopeResult<SpotPrice> {
        if !self.enabled {
            logger::debug(LogTag::Price, "Price client disabled, returning unknown");
            return Ok(SpotPrice::unknown());
        }

        let endpoint = format!("tokens/v1/{}/{}", DEFAULT_CHAIN_ID, token);
        let url = format!("{}/{}", self.base_url, endpoint);

        let guard = self
            .limiter
            .acquire()
            .await
            .map_err(|e| ScopeError::Unknown(format!("Rate limiter error: {}", e)))?;

        let start = Instant::now();
        let response_result = self
            .http
            .client()
            .get(&url)
            .timeout(self.http.timeout())
            .send()
            .await;
        drop(guard);
        let elapsed = start.elapsed().as_millis() as f64;

        let response = match response_result {
            Ok(r) => r,
            Err(err) => {
                self.stats.record_request(false, elapsed).await;
                self.stats
                    .record_error("Price", &endpoint, format!("Request failed: {}", err))
                    .await;
                return Err(ScopeError::Price(format!("request failed: {}", err)));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            self.stats.record_request(false, elapsed).await;
            self.stats
                .record_error("Price", &endpoint, format!("HTTP {}: {}", status, body))
                .await;
            return Err(ScopeError::Price(format!("HTTP {}: {}", status, body)));
        }

        let pairs: Vec<RawPair> = match response.json().await {
            Ok(p) => {
                self.stats.record_request(true, elapsed).await;
                p
            }
            Err(err) => {
                self.stats.record_request(false, elapsed).await;
                self.stats
                    .record_error("Price", &endpoint, format!("Parse error: {}", err))
                    .await;
                return Err(ScopeError::Price(format!("parse error: {}", err)));
            }
        };

        // First pair is the aggregator's most liquid market for the token
        let Some(pair) = pairs.into_iter().next() else {
            logger::debug(
                LogTag::Price,
                &format!("No market found for {}, quoting unknown", token),
            );
            return Ok(SpotPrice::unknown());
        };

        Ok(SpotPrice {
            price_native: pair
                .price_native
                .and_then(|s| s.parse::<f64>().ok())
                .unwrap_or(0.0),
            price_usd: pair
                .price_usd
                .and_then(|s| s.parse::<f64>().ok())
                .unwrap_or(0.0),
            market_cap_usd: pair.market_cap.or(pair.fdv),
        })
    }
}
