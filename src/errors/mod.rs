/// Structured error handling for the analytics engine
///
/// Every failure the engine can hit maps to one variant so callers can make
/// retry/degrade decisions without string matching. Crawl-level failures are
/// absorbed by the crawler (partial results); computation-level failures
/// propagate to the caller as one of these.
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ScopeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Explorer error: {0}")]
    Explorer(String),

    #[error("Rate limit exceeded: {service}")]
    RateLimit { service: String },

    #[error("Block range too large: {from_block}-{to_block}")]
    RangeTooLarge { from_block: u64, to_block: u64 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid address: {address}")]
    InvalidAddress { address: String },

    #[error("Timeout after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Computation locked, not ready: {key}")]
    NotReady { key: String },

    #[error("No block range could be resolved for {subject}")]
    NoBlockRange { subject: String },

    #[error("Price lookup failed: {0}")]
    Price(String),

    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl ScopeError {
    /// Transient upstream errors worth retrying with backoff.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ScopeError::Network(_) => true,
            ScopeError::Timeout { .. } => true,
            ScopeError::RateLimit { .. } => true,
            ScopeError::Http { status, .. } => *status >= 500 || *status == 429,
            ScopeError::Explorer(_) => true,
            _ => false,
        }
    }

    /// Range-too-large errors are handled by adaptive window shrink,
    /// never by the retry loop.
    pub fn is_range_too_large(&self) -> bool {
        matches!(self, ScopeError::RangeTooLarge { .. })
    }
}

impl From<reqwest::Error> for ScopeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScopeError::Timeout { seconds: 0 }
        } else {
            ScopeError::Network(format!("HTTP request failed: {}", err))
        }
    }
}

impl From<serde_json::Error> for ScopeError {
    fn from(err: serde_json::Error) -> Self {
        ScopeError::Parse(format!("JSON: {}", err))
    }
}

pub type ScopeResult<T> = Result<T, ScopeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(ScopeError::Network("reset".to_string()).is_recoverable());
        assert!(ScopeError::Timeout { seconds: 10 }.is_recoverable());
        assert!(ScopeError::Http { status: 503, body: String::new() }.is_recoverable());
        assert!(!ScopeError::Http { status: 400, body: String::new() }.is_recoverable());
        assert!(!ScopeError::InvalidAddress { address: "0x0".to_string() }.is_recoverable());
        assert!(!ScopeError::RangeTooLarge { from_block: 0, to_block: 1 }.is_recoverable());
    }

    #[test]
    fn test_range_too_large_is_not_retryable() {
        let err = ScopeError::RangeTooLarge { from_block: 100, to_block: 500_000 };
        assert!(err.is_range_too_large());
        assert!(!err.is_recoverable());
    }
}
