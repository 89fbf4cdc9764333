//! Observability: in-process metrics for the signal service

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Metrics collector for tracking request outcomes
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<RwLock<MetricsInner>>,
}

struct MetricsInner {
    counters: HashMap<String, u64>,
    gauges: HashMap<String, f64>,
    histograms: HashMap<String, VecDeque<f64>>,
    start_time: Instant,
}

/// Samples kept per histogram
const HISTOGRAM_CAPACITY: usize = 1024;

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MetricsInner {
                counters: HashMap::new(),
                gauges: HashMap::new(),
                histograms: HashMap::new(),
                start_time: Instant::now(),
            })),
        }
    }

    /// Increment a counter
    pub async fn increment(&self, name: &str, value: u64) {
        let mut inner = self.inner.write().await;
        let counter = inner.counters.entry(name.to_string()).or_insert(0);
        *counter += value;
    }

    /// Set a gauge value
    pub async fn gauge(&self, name: &str, value: f64) {
        let mut inner = self.inner.write().await;
        inner.gauges.insert(name.to_string(), value);
    }

    /// Record a histogram value, dropping the oldest sample when full
    pub async fn histogram(&self, name: &str, value: f64) {
        let mut inner = self.inner.write().await;
        let samples = inner.histograms.entry(name.to_string()).or_default();
        if samples.len() >= HISTOGRAM_CAPACITY {
            samples.pop_front();
        }
        samples.push_back(value);
    }

    /// Get all metrics as JSON-serializable format
    pub async fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.read().await;
        let means = inner
            .histograms
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.clone(), v.iter().sum::<f64>() / v.len() as f64))
            .collect();
        MetricsSnapshot {
            counters: inner.counters.clone(),
            gauges: inner.gauges.clone(),
            histogram_means: means,
            uptime_secs: inner.start_time.elapsed().as_secs(),
        }
    }

    /// Get specific counter
    pub async fn get_counter(&self, name: &str) -> u64 {
        let inner = self.inner.read().await;
        inner.counters.get(name).copied().unwrap_or(0)
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSnapshot {
    pub counters: HashMap<String, u64>,
    pub gauges: HashMap<String, f64>,
    pub histogram_means: HashMap<String, f64>,
    pub uptime_secs: u64,
}

/// Predefined metric names
pub mod metrics {
    // Predictions
    pub const PREDICTIONS: &str = "predictions_total";
    pub const PREDICTIONS_UP: &str = "predictions_up_total";
    pub const PREDICTIONS_DOWN: &str = "predictions_down_total";
    pub const PREDICTIONS_NEUTRAL: &str = "predictions_neutral_total";
    pub const PREDICTION_ERRORS: &str = "prediction_errors_total";
    pub const UNSUPPORTED_ASSET: &str = "unsupported_asset_total";
    pub const PREDICTION_DURATION_MS: &str = "prediction_duration_ms";

    // Registry
    pub const LOADED_MODELS: &str = "loaded_models";
    pub const MODEL_RELOADS: &str = "model_reloads_total";
}
