use crate::normalizers::{assemble_candles, validate_candles, RawBar};
use crate::types::*;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
// The chart endpoint rejects requests without a browser-like agent
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) signal-api/0.1";

/// Internal health tracking for API-free health checks
struct HealthTracker {
    /// Timestamp of last successful request (millis since epoch)
    last_success_ms: AtomicU64,
    /// Timestamp of last failed request (millis since epoch)
    last_failure_ms: AtomicU64,
    success_count: AtomicU64,
    failure_count: AtomicU64,
    /// Last known latency in ms
    last_latency_ms: AtomicU64,
}

impl HealthTracker {
    fn new() -> Self {
        Self {
            last_success_ms: AtomicU64::new(0),
            last_failure_ms: AtomicU64::new(0),
            success_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            last_latency_ms: AtomicU64::new(0),
        }
    }

    fn record_success(&self, latency_ms: u64) {
        let now_ms = Utc::now().timestamp_millis() as u64;
        self.last_success_ms.store(now_ms, Ordering::Relaxed);
        self.last_latency_ms.store(latency_ms, Ordering::Relaxed);
        self.success_count.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        let now_ms = Utc::now().timestamp_millis() as u64;
        self.last_failure_ms.store(now_ms, Ordering::Relaxed);
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    fn is_healthy(&self) -> bool {
        let last_success = self.last_success_ms.load(Ordering::Relaxed);
        let last_failure = self.last_failure_ms.load(Ordering::Relaxed);

        // Healthy if: had at least one success AND (no failures OR last success > last failure)
        last_success > 0 && (last_failure == 0 || last_success > last_failure)
    }

    fn success_rate(&self) -> f64 {
        let successes = self.success_count.load(Ordering::Relaxed);
        let failures = self.failure_count.load(Ordering::Relaxed);
        let total = successes + failures;
        if total == 0 {
            return 1.0;
        }
        successes as f64 / total as f64
    }
}

/// Yahoo Finance chart API client for daily OHLCV history
pub struct YahooFinanceClient {
    client: Client,
    base_url: String,
    auto_adjust: bool,
    health_tracker: HealthTracker,
}

impl YahooFinanceClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point the client at another host (mirrors, mock servers)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auto_adjust: true,
            health_tracker: HealthTracker::new(),
        }
    }

    /// Disable split/dividend adjustment of OHLC prices
    pub fn without_adjustment(mut self) -> Self {
        self.auto_adjust = false;
        self
    }

    /// Per-request timeout
    const REQUEST_TIMEOUT_SECS: u64 = 10;
    /// Upper bound on honouring a Retry-After header
    const MAX_RETRY_WAIT_SECS: u64 = 30;

    fn chart_url(&self, ticker: &str, range: &HistoryRange, interval: Interval) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| MarketDataError::ApiError(format!("Invalid base URL: {}", e)))?;

        url.path_segments_mut()
            .map_err(|_| MarketDataError::ApiError("Base URL cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", ticker]);

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("interval", interval.as_str());
            query.append_pair("events", "div,splits");
            match range {
                HistoryRange::Period(period) => {
                    query.append_pair("range", period);
                }
                HistoryRange::Between { start, end } => {
                    query.append_pair("period1", &day_start(*start).to_string());
                    query.append_pair("period2", &day_start(*end).to_string());
                }
            }
        }

        Ok(url)
    }

    /// Request with per-request timeout and one retry on 429
    async fn fetch_chart(&self, ticker: &str, url: Url) -> Result<ChartEnvelope> {
        let request_start = Instant::now();

        for attempt in 0..2 {
            let request_future = self.client.get(url.clone()).send();
            let response = match tokio::time::timeout(
                Duration::from_secs(Self::REQUEST_TIMEOUT_SECS),
                request_future,
            )
            .await
            {
                Ok(Ok(resp)) => resp,
                Ok(Err(e)) => {
                    self.health_tracker.record_failure();
                    return Err(MarketDataError::ApiError(e.to_string()));
                }
                Err(_) => {
                    self.health_tracker.record_failure();
                    return Err(MarketDataError::ApiError(format!(
                        "Yahoo request for {} timed out after {}s",
                        ticker,
                        Self::REQUEST_TIMEOUT_SECS
                    )));
                }
            };

            let status = response.status();

            if status == 429 {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok());

                if attempt == 0 {
                    let wait_secs = retry_after.unwrap_or(5).min(Self::MAX_RETRY_WAIT_SECS);
                    warn!(
                        "Yahoo rate limited, waiting {} seconds before retry",
                        wait_secs
                    );
                    tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                    continue;
                }

                self.health_tracker.record_failure();
                return Err(MarketDataError::RateLimit {
                    source_name: "yahoo".to_string(),
                    retry_after,
                });
            }

            if status == 404 {
                // unknown symbols come back as 404 with a chart.error body
                self.health_tracker.record_failure();
                return Err(MarketDataError::TickerNotFound(ticker.to_string()));
            }

            if !status.is_success() {
                self.health_tracker.record_failure();
                let text = response.text().await.unwrap_or_default();
                return Err(MarketDataError::ApiError(format!(
                    "Yahoo API error ({}): {}",
                    status, text
                )));
            }

            let latency_ms = request_start.elapsed().as_millis() as u64;
            self.health_tracker.record_success(latency_ms);

            return response.json::<ChartEnvelope>().await.map_err(|e| {
                self.health_tracker.record_failure();
                MarketDataError::InvalidResponse(e.to_string())
            });
        }

        Err(MarketDataError::ApiError(
            "Unexpected retry loop exit".to_string(),
        ))
    }

    /// Get adjusted daily history for a ticker, oldest first
    pub async fn get_candles(
        &self,
        ticker: &str,
        range: &HistoryRange,
        interval: Interval,
    ) -> Result<Vec<Candle>> {
        let url = self.chart_url(ticker, range, interval)?;
        debug!("Fetching {} history for {} ({:?})", interval.as_str(), ticker, range);

        let envelope = self.fetch_chart(ticker, url).await?;
        let candles = parse_chart(ticker, envelope, self.auto_adjust)?;

        debug!("Received {} candles for {}", candles.len(), ticker);
        Ok(candles)
    }

    /// Get health status using internal metrics (no API call)
    pub async fn health(&self) -> SourceHealth {
        let last_success_ms = self.health_tracker.last_success_ms.load(Ordering::Relaxed);
        let last_success = if last_success_ms > 0 {
            DateTime::from_timestamp_millis(last_success_ms as i64)
        } else {
            None
        };

        let is_healthy = self.health_tracker.is_healthy();

        SourceHealth {
            source: "yahoo".to_string(),
            is_healthy,
            last_success,
            last_error: if is_healthy {
                None
            } else {
                Some("Recent failures detected".to_string())
            },
            success_rate: self.health_tracker.success_rate(),
            avg_latency_ms: self.health_tracker.last_latency_ms.load(Ordering::Relaxed),
        }
    }
}

impl Default for YahooFinanceClient {
    fn default() -> Self {
        Self::new()
    }
}

fn day_start(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// Convert a chart response into cleaned candles
fn parse_chart(ticker: &str, envelope: ChartEnvelope, auto_adjust: bool) -> Result<Vec<Candle>> {
    if let Some(err) = envelope.chart.error {
        return Err(if err.code.eq_ignore_ascii_case("Not Found") {
            MarketDataError::TickerNotFound(ticker.to_string())
        } else {
            MarketDataError::ApiError(format!("{}: {}", err.code, err.description))
        });
    }

    let result = envelope
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| MarketDataError::NoData(ticker.to_string()))?;

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let adjclose = result
        .indicators
        .adjclose
        .into_iter()
        .next()
        .map(|a| a.adjclose)
        .unwrap_or_default();

    let at = |series: &[Option<f64>], i: usize| series.get(i).copied().flatten();

    let rows: Vec<RawBar> = result
        .timestamp
        .iter()
        .enumerate()
        .map(|(i, ts)| RawBar {
            timestamp: DateTime::from_timestamp(*ts, 0),
            open: at(&quote.open, i),
            high: at(&quote.high, i),
            low: at(&quote.low, i),
            close: at(&quote.close, i),
            volume: at(&quote.volume, i),
            adj_close: at(&adjclose, i),
        })
        .collect();

    let candles = assemble_candles(rows, auto_adjust);
    if candles.is_empty() {
        return Err(MarketDataError::NoData(ticker.to_string()));
    }
    validate_candles(&candles)?;

    Ok(candles)
}

// Response types for the chart API
#[derive(Debug, serde::Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, serde::Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, serde::Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, serde::Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, serde::Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
    #[serde(default)]
    adjclose: Vec<AdjCloseSeries>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, serde::Deserialize)]
struct AdjCloseSeries {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

#[async_trait::async_trait]
impl HistoricalDataSource for YahooFinanceClient {
    async fn get_candles(
        &self,
        ticker: &str,
        range: &HistoryRange,
        interval: Interval,
    ) -> Result<Vec<Candle>> {
        YahooFinanceClient::get_candles(self, ticker, range, interval).await
    }

    async fn health(&self) -> SourceHealth {
        YahooFinanceClient::health(self).await
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(json: serde_json::Value) -> ChartEnvelope {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_chart_url_with_period() {
        let client = YahooFinanceClient::with_base_url("http://localhost:9000/");
        let url = client
            .chart_url("EURUSD=X", &HistoryRange::period("5y"), Interval::Day1)
            .unwrap();

        assert_eq!(url.path(), "/v8/finance/chart/EURUSD=X");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("range".to_string(), "5y".to_string())));
        assert!(pairs.contains(&("interval".to_string(), "1d".to_string())));
    }

    #[test]
    fn test_chart_url_with_window() {
        let client = YahooFinanceClient::with_base_url("http://localhost:9000");
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let url = client
            .chart_url("BTC-USD", &HistoryRange::Between { start, end }, Interval::Day1)
            .unwrap();

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("period1".to_string(), "1704067200".to_string())));
        assert!(pairs.contains(&("period2".to_string(), "1704153600".to_string())));
    }

    #[test]
    fn test_parse_chart_skips_null_rows() {
        let body = envelope(serde_json::json!({
            "chart": {
                "result": [{
                    "timestamp": [1704067200, 1704153600, 1704240000],
                    "indicators": {
                        "quote": [{
                            "open": [1.0, null, 1.2],
                            "high": [1.1, 1.2, 1.3],
                            "low": [0.9, 1.0, 1.1],
                            "close": [1.05, 1.15, 1.25],
                            "volume": [0, 0, 0]
                        }]
                    }
                }],
                "error": null
            }
        }));

        let candles = parse_chart("EURUSD=X", body, true).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[1].close, 1.25);
    }

    #[test]
    fn test_parse_chart_not_found() {
        let body = envelope(serde_json::json!({
            "chart": {
                "result": null,
                "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" }
            }
        }));

        let err = parse_chart("NOPE", body, true).unwrap_err();
        assert!(matches!(err, MarketDataError::TickerNotFound(t) if t == "NOPE"));
    }

    #[test]
    fn test_health_before_any_request() {
        let client = YahooFinanceClient::new();
        let health = tokio_test::block_on(client.health());
        assert!(!health.is_healthy);
        assert_eq!(health.success_rate, 1.0);
        assert!(health.last_success.is_none());
    }
}
