//! Direction labels for supervised training

use super::features::FeatureRow;
use crate::error::{Result, SignalError};

pub const LABEL_DOWN: u32 = 0;
pub const LABEL_UP: u32 = 1;

/// Feature row paired with its forward-looking target
#[derive(Debug, Clone, PartialEq)]
pub struct LabelledRow {
    pub features: FeatureRow,
    pub future_close: f64,
    /// 1 if the close `horizon_days` bars ahead is strictly higher, else 0
    pub target_up: u32,
}

/// Label each row by comparing its close to the close `horizon_days` bars
/// later. The last `horizon_days` rows have no future and are dropped.
pub fn create_direction_labels(rows: &[FeatureRow], horizon_days: usize) -> Result<Vec<LabelledRow>> {
    if horizon_days == 0 {
        return Err(SignalError::InvalidInput(
            "horizon_days must be at least 1".to_string(),
        ));
    }

    Ok(rows
        .iter()
        .zip(rows.iter().skip(horizon_days))
        .map(|(current, future)| LabelledRow {
            features: current.clone(),
            future_close: future.close,
            target_up: if future.close > current.close {
                LABEL_UP
            } else {
                LABEL_DOWN
            },
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn rows(closes: &[f64]) -> Vec<FeatureRow> {
        closes
            .iter()
            .map(|c| FeatureRow {
                timestamp: Utc::now(),
                close: *c,
                values: [0.0; 6],
            })
            .collect()
    }

    #[test]
    fn test_one_day_horizon() {
        let labelled = create_direction_labels(&rows(&[1.0, 2.0, 2.0, 1.5]), 1).unwrap();

        assert_eq!(labelled.len(), 3);
        let targets: Vec<u32> = labelled.iter().map(|r| r.target_up).collect();
        // equal closes are not an up move
        assert_eq!(targets, vec![LABEL_UP, LABEL_DOWN, LABEL_DOWN]);
        assert_eq!(labelled[0].future_close, 2.0);
    }

    #[test]
    fn test_longer_horizon_drops_tail() {
        let labelled = create_direction_labels(&rows(&[1.0, 0.5, 3.0, 0.1, 0.2]), 2).unwrap();

        assert_eq!(labelled.len(), 3);
        assert_eq!(labelled[0].target_up, LABEL_UP);
        assert_eq!(labelled[1].target_up, LABEL_DOWN);
        assert_eq!(labelled[2].future_close, 0.2);
    }

    #[test]
    fn test_horizon_longer_than_series() {
        assert!(create_direction_labels(&rows(&[1.0, 2.0]), 5).unwrap().is_empty());
    }

    #[test]
    fn test_zero_horizon_rejected() {
        assert!(create_direction_labels(&rows(&[1.0, 2.0]), 0).is_err());
    }
}
