//! Live UP / DOWN / NEUTRAL signal for one asset

use crate::config::PredictionSettings;
use crate::error::{Result, SignalError};
use crate::pipeline::latest_feature_vector;
use crate::registry::ModelRegistry;
use chrono::Utc;
use market_data::{Asset, HistoricalDataSource, HistoryRange, Interval};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Extra calendar days fetched on top of the lookback so weekends and
/// holidays still leave enough bars for the 20-day window
const HISTORY_BUFFER_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Up,
    Down,
    Neutral,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Up => "UP",
            Signal::Down => "DOWN",
            Signal::Neutral => "NEUTRAL",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// UP wins if both sides clear the threshold, which only happens below 0.5
pub fn classify(prob_up: f64, prob_down: f64, threshold: f64) -> Signal {
    if prob_up > threshold {
        Signal::Up
    } else if prob_down > threshold {
        Signal::Down
    } else {
        Signal::Neutral
    }
}

pub fn explanation(signal: Signal, prob_up: f64, prob_down: f64) -> String {
    format!(
        "Model indicates {} signal with {:.2} probability of upward move and {:.2} \
         probability of downward move in the next ~24 hours (research prototype, not financial advice).",
        signal, prob_up, prob_down
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct SignalResult {
    pub asset: Asset,
    pub signal: Signal,
    pub prob_up: f64,
    pub prob_down: f64,
    pub explanation: String,
}

/// Fetch recent history, build the latest feature row, and score it with
/// the asset's model
pub async fn generate_signal(
    asset: &Asset,
    registry: &ModelRegistry,
    source: &dyn HistoricalDataSource,
    settings: &PredictionSettings,
) -> Result<SignalResult> {
    let model = registry
        .get(asset)
        .ok_or_else(|| SignalError::NoModelLoaded(asset.name().to_string()))?;

    // end is exclusive: the newest bar is the last completed day
    let today = Utc::now().date_naive();
    let range = HistoryRange::trailing_days(today, settings.lookback_days + HISTORY_BUFFER_DAYS);
    let candles = source
        .get_candles(asset.ticker(), &range, Interval::Day1)
        .await?;

    let latest = latest_feature_vector(&candles)?;
    debug!(
        "Latest features for {} at {}: {:?}",
        asset, latest.timestamp, latest.values
    );

    let scaled = model.scaler.transform_row(&latest.values)?;
    let probs = model.artifact.forest.predict_proba_row(&scaled)?;

    let signal = classify(probs.up, probs.down, settings.threshold);
    Ok(SignalResult {
        asset: *asset,
        signal,
        prob_up: probs.up,
        prob_down: probs.down,
        explanation: explanation(signal, probs.up, probs.down),
    })
}
