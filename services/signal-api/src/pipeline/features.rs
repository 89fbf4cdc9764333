//! Technical features computed from daily closes.
//!
//! Every window is trailing and inclusive of the current bar, so a row only
//! depends on history up to and including its own close.

use crate::error::{Result, SignalError};
use chrono::{DateTime, Utc};
use market_data::Candle;

/// Fixed feature columns for the whole project, in model order
pub const FEATURE_COLUMNS: [&str; N_FEATURES] =
    ["return_1d", "ma_5", "ma_10", "ma_20", "vol_5", "vol_10"];

pub const N_FEATURES: usize = 6;

const MA_WINDOWS: [usize; 3] = [5, 10, 20];
const VOL_WINDOWS: [usize; 2] = [5, 10];

/// Rows dropped at the start of a gap-free series before every column is defined
pub const WARMUP_ROWS: usize = 19;

/// One bar with all feature columns defined
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub values: [f64; N_FEATURES],
}

impl FeatureRow {
    pub fn vector(&self) -> [f64; N_FEATURES] {
        self.values
    }
}

/// Owned copy of the column names
pub fn feature_names() -> Vec<String> {
    FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect()
}

/// Simple percentage change; undefined for the first bar
pub fn pct_change(closes: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(closes.len());
    for i in 0..closes.len() {
        if i == 0 {
            out.push(None);
        } else {
            let r = closes[i] / closes[i - 1] - 1.0;
            out.push(r.is_finite().then_some(r));
        }
    }
    out
}

/// Trailing mean over `window` values
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if window == 0 || i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            Some(slice.iter().sum::<f64>() / window as f64)
        })
        .collect()
}

/// Trailing sample standard deviation (n - 1); undefined if any input in
/// the window is undefined
pub fn rolling_std(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if window < 2 || i + 1 < window {
                return None;
            }
            let slice: Option<Vec<f64>> = values[i + 1 - window..=i].iter().copied().collect();
            let slice = slice?;
            let mean = slice.iter().sum::<f64>() / window as f64;
            let var = slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (window - 1) as f64;
            Some(var.sqrt())
        })
        .collect()
}

/// Compute every feature column and keep only fully-defined rows
pub fn add_technical_features(candles: &[Candle]) -> Vec<FeatureRow> {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

    let returns = pct_change(&closes);
    let mas: Vec<Vec<Option<f64>>> = MA_WINDOWS
        .iter()
        .map(|w| rolling_mean(&closes, *w))
        .collect();
    let vols: Vec<Vec<Option<f64>>> = VOL_WINDOWS
        .iter()
        .map(|w| rolling_std(&returns, *w))
        .collect();

    candles
        .iter()
        .enumerate()
        .filter_map(|(i, candle)| {
            let values = [
                returns[i]?,
                mas[0][i]?,
                mas[1][i]?,
                mas[2][i]?,
                vols[0][i]?,
                vols[1][i]?,
            ];
            Some(FeatureRow {
                timestamp: candle.timestamp,
                close: candle.close,
                values,
            })
        })
        .collect()
}

/// Feature row for the most recent bar, used for live prediction
pub fn latest_feature_vector(candles: &[Candle]) -> Result<FeatureRow> {
    add_technical_features(candles)
        .pop()
        .ok_or(SignalError::InsufficientHistory {
            needed: WARMUP_ROWS + 1,
            got: candles.len(),
        })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| Candle {
                timestamp: start + chrono::Duration::days(i as i64),
                open: *close,
                high: *close,
                low: *close,
                close: *close,
                volume: 0.0,
            })
            .collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_pct_change() {
        let r = pct_change(&[100.0, 110.0, 99.0]);
        assert_eq!(r[0], None);
        assert!(approx(r[1].unwrap(), 0.1));
        assert!(approx(r[2].unwrap(), -0.1));
    }

    #[test]
    fn test_rolling_mean() {
        let m = rolling_mean(&[1.0, 2.0, 3.0, 4.0], 3);
        assert_eq!(m[..2], [None, None]);
        assert_eq!(m[2], Some(2.0));
        assert_eq!(m[3], Some(3.0));
    }

    #[test]
    fn test_rolling_std_uses_sample_denominator() {
        let s = rolling_std(&[None, Some(1.0), Some(2.0), Some(3.0)], 3);
        assert_eq!(s[2], None); // window touches the undefined first value
        assert!(approx(s[3].unwrap(), 1.0));
    }

    #[test]
    fn test_warmup_rows_dropped() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let rows = add_technical_features(&candles_from_closes(&closes));

        assert_eq!(rows.len(), 30 - WARMUP_ROWS);
        assert_eq!(rows[0].close, closes[WARMUP_ROWS]);
    }

    #[test]
    fn test_feature_values_for_last_row() {
        let closes: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
        let row = latest_feature_vector(&candles_from_closes(&closes)).unwrap();

        // closes 100..=124, last = 124
        assert!(approx(row.values[0], 124.0 / 123.0 - 1.0));
        assert!(approx(row.values[1], 122.0));
        assert!(approx(row.values[2], 119.5));
        assert!(approx(row.values[3], 114.5));
        assert!(row.values[4] > 0.0);
        assert!(row.values[5] > 0.0);

        let vector: [f64; N_FEATURES] = row.vector();
        assert_eq!(vector, row.values);
    }

    #[test]
    fn test_constant_prices_have_zero_volatility() {
        let rows = add_technical_features(&candles_from_closes(&[50.0; 21]));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].values, [0.0, 50.0, 50.0, 50.0, 0.0, 0.0]);
    }

    #[test]
    fn test_short_history_is_an_error() {
        let err = latest_feature_vector(&candles_from_closes(&[1.0; 10])).unwrap_err();
        assert!(matches!(
            err,
            SignalError::InsufficientHistory { needed: 20, got: 10 }
        ));
    }
}
