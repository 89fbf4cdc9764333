//! Prediction endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use market_data::Asset;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::ApiError;
use crate::{
    error::SignalError,
    observability::metrics,
    prediction::{generate_signal, Signal, SignalResult},
    AppState,
};

const DEFAULT_HORIZON_HOURS: u32 = 24;

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub asset: String,
    /// Accepted for forward compatibility; models are trained on a fixed
    /// one-day horizon. Missing or null means 24.
    #[serde(default)]
    pub horizon_hours: Option<u32>,
}

/// POST /predict
pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<SignalResult>, ApiError> {
    let start = std::time::Instant::now();
    let Json(req) = payload?;
    let horizon_hours = req.horizon_hours.unwrap_or(DEFAULT_HORIZON_HOURS);

    let Some(asset) = Asset::parse(&req.asset) else {
        state.metrics.increment(metrics::UNSUPPORTED_ASSET, 1).await;
        return Err(SignalError::UnsupportedAsset(req.asset.to_uppercase()).into());
    };

    let registry = state.registry().await;
    let result = generate_signal(
        &asset,
        &registry,
        state.source.as_ref(),
        &state.settings.prediction,
    )
    .await;

    let duration = start.elapsed().as_millis() as f64;
    state.metrics.histogram(metrics::PREDICTION_DURATION_MS, duration).await;
    state.metrics.increment(metrics::PREDICTIONS, 1).await;

    match result {
        Ok(signal) => {
            let counter = match signal.signal {
                Signal::Up => metrics::PREDICTIONS_UP,
                Signal::Down => metrics::PREDICTIONS_DOWN,
                Signal::Neutral => metrics::PREDICTIONS_NEUTRAL,
            };
            state.metrics.increment(counter, 1).await;
            info!(
                asset = %asset,
                signal = %signal.signal,
                prob_up = signal.prob_up,
                horizon_hours,
                "prediction"
            );
            Ok(Json(signal))
        }
        Err(e) => {
            state.metrics.increment(metrics::PREDICTION_ERRORS, 1).await;
            warn!("Prediction failed for {}: {}", asset, e);
            Err(e.into())
        }
    }
}
