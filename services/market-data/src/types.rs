use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Daily (or coarser) OHLCV candle, prices already adjusted for splits/dividends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Supported bar intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interval {
    Day1,
    Week1,
    Month1,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Day1 => "1d",
            Interval::Week1 => "1wk",
            Interval::Month1 => "1mo",
        }
    }
}

/// Which slice of history to request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryRange {
    /// Provider-relative period ending now, e.g. "5y", "1mo", "max"
    Period(String),
    /// Explicit calendar window; `end` is exclusive
    Between { start: NaiveDate, end: NaiveDate },
}

impl HistoryRange {
    pub fn period(period: impl Into<String>) -> Self {
        HistoryRange::Period(period.into())
    }

    /// Window of `days` calendar days ending at `end`
    pub fn trailing_days(end: NaiveDate, days: i64) -> Self {
        HistoryRange::Between {
            start: end - chrono::Duration::days(days),
            end,
        }
    }
}

/// Data source health/status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceHealth {
    pub source: String,
    pub is_healthy: bool,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub success_rate: f64,
    pub avg_latency_ms: u64,
}

/// Error types for market data retrieval
#[derive(Debug, thiserror::Error)]
pub enum MarketDataError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Rate limit exceeded for {source_name}")]
    RateLimit {
        source_name: String,
        retry_after: Option<u64>,
    },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Ticker not found: {0}")]
    TickerNotFound(String),

    #[error("No usable data for {0}")]
    NoData(String),
}

/// Result type for market data operations
pub type Result<T> = std::result::Result<T, MarketDataError>;

/// Trait for historical OHLCV sources
#[async_trait::async_trait]
pub trait HistoricalDataSource: Send + Sync {
    /// Get candles for a provider ticker, oldest first
    async fn get_candles(
        &self,
        ticker: &str,
        range: &HistoryRange,
        interval: Interval,
    ) -> Result<Vec<Candle>>;

    /// Get source health status
    async fn health(&self) -> SourceHealth;

    /// Source name
    fn name(&self) -> &str;
}
