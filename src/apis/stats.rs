/// Per-API request statistics
///
/// Every upstream client carries one tracker so operators can see request
/// volume, failure rate, and latency per provider without external metrics
/// infrastructure.
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ApiStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub avg_response_time_ms: f64,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
}

impl ApiStats {
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.successful_requests as f64 / self.total_requests as f64
        }
    }
}

#[derive(Debug, Default)]
struct StatsInner {
    stats: ApiStats,
    total_response_time_ms: f64,
}

/// Thread-safe stats tracker shared across clones of a client
pub struct ApiStatsTracker {
    inner: Arc<RwLock<StatsInner>>,
}

impl ApiStatsTracker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(StatsInner::default())),
        }
    }

    pub async fn record_request(&self, success: bool, elapsed_ms: f64) {
        let mut inner = self.inner.write().await;
        inner.stats.total_requests += 1;
        if success {
            inner.stats.successful_requests += 1;
        } else {
            inner.stats.failed_requests += 1;
        }
        inner.total_response_time_ms += elapsed_ms;
        inner.stats.avg_response_time_ms =
            inner.total_response_time_ms / inner.stats.total_requests as f64;
    }

    pub async fn record_error(&self, provider: &str, endpoint: &str, message: String) {
        let mut inner = self.inner.write().await;
        inner.stats.last_error = Some(format!("[{}] {}: {}", provider, endpoint, message));
        inner.stats.last_error_at = Some(Utc::now());
    }

    pub async fn get_stats(&self) -> ApiStats {
        self.inner.read().await.stats.clone()
    }
}
