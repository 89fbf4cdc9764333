use crate::error::{Result, SignalError};
use serde::{Deserialize, Serialize};

/// Per-column standardization: `(x - mean) / scale`
///
/// `scale` is the population standard deviation of the training column,
/// with zero replaced by 1.0 so constant columns pass through centred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let first = rows
            .first()
            .ok_or_else(|| SignalError::InvalidInput("cannot fit scaler on zero rows".to_string()))?;
        let n_features = first.len();
        check_width(rows, n_features)?;

        let n = rows.len() as f64;
        let mut mean = vec![0.0; n_features];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0; n_features];
        for row in rows {
            for ((acc, v), m) in var.iter_mut().zip(row).zip(&mean) {
                *acc += (v - m).powi(2);
            }
        }

        let scale = var
            .into_iter()
            .map(|s| {
                let sd = (s / n).sqrt();
                if sd > 0.0 && sd.is_finite() {
                    sd
                } else {
                    1.0
                }
            })
            .collect();

        Ok(Self { mean, scale })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.n_features() {
            return Err(SignalError::FeatureMismatch {
                expected: self.n_features(),
                got: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect())
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }
}

fn check_width(rows: &[Vec<f64>], n_features: usize) -> Result<()> {
    match rows.iter().find(|r| r.len() != n_features) {
        Some(bad) => Err(SignalError::FeatureMismatch {
            expected: n_features,
            got: bad.len(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_population_std() {
        let rows = vec![vec![1.0, 10.0], vec![3.0, 10.0]];
        let scaler = StandardScaler::fit(&rows).unwrap();

        assert_eq!(scaler.mean, vec![2.0, 10.0]);
        // population std of [1, 3] is 1; constant column falls back to 1
        assert_eq!(scaler.scale, vec![1.0, 1.0]);

        let out = scaler.transform(&rows).unwrap();
        assert_eq!(out, vec![vec![-1.0, 0.0], vec![1.0, 0.0]]);
    }

    #[test]
    fn test_transform_rejects_wrong_width() {
        let scaler = StandardScaler::fit(&[vec![1.0, 2.0]]).unwrap();
        let err = scaler.transform_row(&[1.0]).unwrap_err();
        assert!(matches!(err, SignalError::FeatureMismatch { expected: 2, got: 1 }));
    }

    #[test]
    fn test_fit_rejects_empty_and_ragged() {
        assert!(StandardScaler::fit(&[]).is_err());
        assert!(StandardScaler::fit(&[vec![1.0, 2.0], vec![1.0]]).is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let scaler = StandardScaler::fit(&[vec![0.5, 4.0], vec![1.5, 8.0]]).unwrap();
        let json = serde_json::to_string(&scaler).unwrap();
        let back: StandardScaler = serde_json::from_str(&json).unwrap();
        assert_eq!(back, scaler);
    }
}
