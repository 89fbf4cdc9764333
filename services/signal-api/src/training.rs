//! Offline training: history -> features/labels -> scaler + forest -> files

use crate::config::TrainingSettings;
use crate::error::Result;
use crate::model::{save_pair, ClassificationReport, DirectionForest, ForestParams, ModelArtifact, StandardScaler};
use crate::pipeline::prepare_training_data;
use chrono::Utc;
use market_data::{Asset, HistoricalDataSource};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

impl From<&TrainingSettings> for ForestParams {
    fn from(settings: &TrainingSettings) -> Self {
        ForestParams {
            n_estimators: settings.n_estimators,
            max_depth: settings.max_depth,
            min_samples_split: settings.min_samples_split,
            max_features: None,
            seed: settings.seed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingOutcome {
    pub asset: Asset,
    pub train_rows: usize,
    pub test_rows: usize,
    pub test_accuracy: Option<f64>,
    pub report: Option<ClassificationReport>,
    pub model_path: PathBuf,
    pub scaler_path: PathBuf,
}

#[derive(Debug, Default, Serialize)]
pub struct TrainingSummary {
    pub trained: Vec<TrainingOutcome>,
    /// No usable rows after feature construction
    pub skipped: Vec<Asset>,
    pub failed: Vec<(Asset, String)>,
}

/// Train and persist one asset's pair. `Ok(None)` when the fetched history
/// yields no training rows.
pub async fn train_asset(
    asset: &Asset,
    source: &dyn HistoricalDataSource,
    settings: &TrainingSettings,
    models_dir: &Path,
) -> Result<Option<TrainingOutcome>> {
    info!("=== Training model for {} ({}) ===", asset, asset.ticker());

    let data = prepare_training_data(source, asset.ticker(), &settings.period, settings.horizon_days).await?;
    if data.is_empty() {
        warn!("No data for {}, skipping", asset);
        return Ok(None);
    }

    let (train, test) = data.time_split(settings.test_fraction)?;

    let scaler = StandardScaler::fit(&train.x)?;
    let x_train = scaler.transform(&train.x)?;
    let x_test = scaler.transform(&test.x)?;

    let forest = DirectionForest::fit(&x_train, &train.y, &ForestParams::from(settings))?;

    let report = if test.is_empty() {
        None
    } else {
        let predicted = forest.predict(&x_test)?;
        let report = ClassificationReport::from_predictions(&test.y, &predicted);
        info!("Classification report for {}:\n{}", asset, report);
        Some(report)
    };

    let artifact = ModelArtifact {
        asset: asset.name().to_string(),
        feature_names: train.feature_names.clone(),
        horizon_days: settings.horizon_days,
        trained_at: Utc::now(),
        train_rows: train.len(),
        test_rows: test.len(),
        test_accuracy: report.as_ref().map(|r| r.accuracy),
        forest,
        scaler: scaler.clone(),
    };

    let (model_path, scaler_path) = save_pair(models_dir, asset, &artifact, &scaler)?;
    info!("Saved model to {}", model_path.display());
    info!("Saved scaler to {}", scaler_path.display());

    Ok(Some(TrainingOutcome {
        asset: *asset,
        train_rows: artifact.train_rows,
        test_rows: artifact.test_rows,
        test_accuracy: artifact.test_accuracy,
        report,
        model_path,
        scaler_path,
    }))
}

/// Train each asset in turn; one failure does not stop the rest
pub async fn train_all(
    assets: &[Asset],
    source: &dyn HistoricalDataSource,
    settings: &TrainingSettings,
    models_dir: &Path,
) -> TrainingSummary {
    let mut summary = TrainingSummary::default();

    for asset in assets {
        match train_asset(asset, source, settings, models_dir).await {
            Ok(Some(outcome)) => summary.trained.push(outcome),
            Ok(None) => summary.skipped.push(*asset),
            Err(e) => {
                error!("Training failed for {}: {}", asset, e);
                summary.failed.push((*asset, e.to_string()));
            }
        }
    }

    info!(
        "Training finished: {} trained, {} skipped, {} failed",
        summary.trained.len(),
        summary.skipped.len(),
        summary.failed.len()
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::features::tests::candles_from_closes;
    use crate::registry::ModelRegistry;
    use market_data::{Candle, HistoryRange, Interval, MarketDataError, SourceHealth};
    use std::collections::HashMap;

    /// Candles per ticker; unknown tickers are "not found"
    struct TickerSource(HashMap<&'static str, Vec<Candle>>);

    #[async_trait::async_trait]
    impl HistoricalDataSource for TickerSource {
        async fn get_candles(
            &self,
            ticker: &str,
            _range: &HistoryRange,
            _interval: Interval,
        ) -> market_data::Result<Vec<Candle>> {
            self.0
                .get(ticker)
                .cloned()
                .ok_or_else(|| MarketDataError::TickerNotFound(ticker.to_string()))
        }

        async fn health(&self) -> SourceHealth {
            SourceHealth {
                source: "tickers".to_string(),
                is_healthy: true,
                last_success: None,
                last_error: None,
                success_rate: 1.0,
                avg_latency_ms: 0,
            }
        }

        fn name(&self) -> &str {
            "tickers"
        }
    }

    fn wave(n: usize) -> Vec<Candle> {
        let closes: Vec<f64> = (0..n)
            .map(|i| 100.0 + 5.0 * (i as f64 * 0.7).sin() + i as f64 * 0.05)
            .collect();
        candles_from_closes(&closes)
    }

    fn fast_settings() -> TrainingSettings {
        TrainingSettings {
            n_estimators: 10,
            ..TrainingSettings::default()
        }
    }

    #[tokio::test]
    async fn test_train_asset_writes_loadable_pair() {
        let dir = tempfile::tempdir().unwrap();
        let asset = Asset::parse("EURUSD").unwrap();
        let source = TickerSource(HashMap::from([("EURUSD=X", wave(150))]));

        let outcome = train_asset(&asset, &source, &fast_settings(), dir.path())
            .await
            .unwrap()
            .unwrap();

        // 150 - 19 warmup - 1 horizon = 130 rows, ceil(26.0) = 26 for test
        assert_eq!(outcome.train_rows, 104);
        assert_eq!(outcome.test_rows, 26);
        let accuracy = outcome.test_accuracy.unwrap();
        assert!((0.0..=1.0).contains(&accuracy));
        assert!(outcome.model_path.exists());
        assert!(outcome.scaler_path.exists());

        let (registry, _) = ModelRegistry::load_all(dir.path());
        let loaded = registry.get(&asset).unwrap();
        assert_eq!(loaded.artifact.forest.n_trees(), 10);
        assert_eq!(loaded.artifact.train_rows, 104);
    }

    #[tokio::test]
    async fn test_short_history_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let asset = Asset::parse("GBPUSD").unwrap();
        let source = TickerSource(HashMap::from([("GBPUSD=X", wave(15))]));

        let outcome = train_asset(&asset, &source, &fast_settings(), dir.path())
            .await
            .unwrap();
        assert!(outcome.is_none());
        assert!(!dir.path().join("GBPUSD_model.bin").exists());
    }

    #[tokio::test]
    async fn test_train_all_continues_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source = TickerSource(HashMap::from([
            ("BTC-USD", wave(120)),
            ("JPY=X", wave(10)),
        ]));

        let summary = train_all(&Asset::all(), &source, &fast_settings(), dir.path()).await;

        assert_eq!(summary.trained.len(), 1);
        assert_eq!(summary.trained[0].asset.name(), "BTCUSD");
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].name(), "USDJPY");
        assert_eq!(summary.failed.len(), 2);
    }
}
