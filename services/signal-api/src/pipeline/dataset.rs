//! Training matrices built from fetched history

use super::features::{add_technical_features, feature_names};
use super::labels::create_direction_labels;
use crate::error::{Result, SignalError};
use market_data::{Candle, HistoricalDataSource, HistoryRange, Interval};
use tracing::debug;

/// Feature matrix and labels, rows in time order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    pub x: Vec<Vec<f64>>,
    pub y: Vec<u32>,
    pub feature_names: Vec<String>,
}

impl TrainingSet {
    /// Build from candles: features, then labels
    pub fn from_candles(candles: &[Candle], horizon_days: usize) -> Result<Self> {
        let features = add_technical_features(candles);
        debug!("{} candles -> {} feature rows", candles.len(), features.len());

        let labelled = create_direction_labels(&features, horizon_days)?;
        debug!("{} labelled rows (horizon {})", labelled.len(), horizon_days);

        let (x, y) = labelled
            .into_iter()
            .map(|row| (row.features.vector().to_vec(), row.target_up))
            .unzip();

        Ok(Self {
            x,
            y,
            feature_names: feature_names(),
        })
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Time-ordered split without shuffling; the test set is the most recent
    /// `ceil(n * test_fraction)` rows
    pub fn time_split(self, test_fraction: f64) -> Result<(TrainingSet, TrainingSet)> {
        if !(0.0..1.0).contains(&test_fraction) {
            return Err(SignalError::InvalidInput(format!(
                "test_fraction must be in [0, 1), got {}",
                test_fraction
            )));
        }

        let n = self.len();
        let n_test = (n as f64 * test_fraction).ceil() as usize;
        let n_train = n.saturating_sub(n_test);
        if n_train == 0 {
            return Err(SignalError::InsufficientHistory { needed: n_test + 1, got: n });
        }

        let TrainingSet { mut x, mut y, feature_names } = self;
        let x_test = x.split_off(n_train);
        let y_test = y.split_off(n_train);

        Ok((
            TrainingSet {
                x,
                y,
                feature_names: feature_names.clone(),
            },
            TrainingSet {
                x: x_test,
                y: y_test,
                feature_names,
            },
        ))
    }
}

/// Full pipeline: fetch history, add features, create labels
pub async fn prepare_training_data(
    source: &dyn HistoricalDataSource,
    ticker: &str,
    period: &str,
    horizon_days: usize,
) -> Result<TrainingSet> {
    let candles = source
        .get_candles(ticker, &HistoryRange::period(period), Interval::Day1)
        .await?;
    debug!("Fetched {} raw candles for {}", candles.len(), ticker);

    let set = TrainingSet::from_candles(&candles, horizon_days)?;
    debug!(
        "Training data for {}: X=({}, {}), y=({},)",
        ticker,
        set.len(),
        set.feature_names.len(),
        set.y.len()
    );
    Ok(set)
}
