//! Bagged decision-tree ensemble for UP/DOWN classification.
//!
//! Each tree is a smartcore CART tree trained on a bootstrap resample of the
//! rows and a random subset of the feature columns. Class probabilities are
//! the share of trees voting for each class.

use crate::error::{Result, SignalError};
use crate::pipeline::{LABEL_DOWN, LABEL_UP};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_classifier::{
    DecisionTreeClassifier, DecisionTreeClassifierParameters,
};
use std::fmt;

type Tree = DecisionTreeClassifier<f64, u32, DenseMatrix<f64>, Vec<u32>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: u16,
    pub min_samples_split: usize,
    /// Columns drawn per tree; `None` uses floor(sqrt(n_features)), at least 1
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: 6,
            min_samples_split: 2,
            max_features: None,
            seed: 42,
        }
    }
}

/// Probability of each direction; sums to 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassProbabilities {
    pub down: f64,
    pub up: f64,
}

#[derive(Serialize, Deserialize)]
enum ForestTree {
    /// Bootstrap sample held a single class
    Constant(u32),
    Split { features: Vec<usize>, tree: Tree },
}

#[derive(Serialize, Deserialize)]
pub struct DirectionForest {
    params: ForestParams,
    n_features: usize,
    trees: Vec<ForestTree>,
}

impl fmt::Debug for DirectionForest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectionForest")
            .field("params", &self.params)
            .field("n_features", &self.n_features)
            .field("n_trees", &self.trees.len())
            .finish()
    }
}

/// floor(sqrt(n)), never below one column
fn default_max_features(n_features: usize) -> usize {
    ((n_features as f64).sqrt().floor() as usize).max(1)
}

fn model_err(e: impl fmt::Display) -> SignalError {
    SignalError::Model(e.to_string())
}

/// Row-major matrix of the selected columns of `rows`
fn column_subset<'a>(
    rows: impl ExactSizeIterator<Item = &'a Vec<f64>>,
    features: &[usize],
) -> DenseMatrix<f64> {
    let n_rows = rows.len();
    let mut values = Vec::with_capacity(n_rows * features.len());
    for row in rows {
        values.extend(features.iter().map(|&f| row[f]));
    }
    DenseMatrix::new(n_rows, features.len(), values, false)
}

impl DirectionForest {
    /// Fit on rows `x` with binary labels `y` (0 = down, 1 = up)
    pub fn fit(x: &[Vec<f64>], y: &[u32], params: &ForestParams) -> Result<Self> {
        if x.is_empty() {
            return Err(SignalError::InvalidInput(
                "cannot fit forest on zero rows".to_string(),
            ));
        }
        if x.len() != y.len() {
            return Err(SignalError::InvalidInput(format!(
                "{} feature rows but {} labels",
                x.len(),
                y.len()
            )));
        }
        if params.n_estimators == 0 {
            return Err(SignalError::InvalidInput(
                "n_estimators must be positive".to_string(),
            ));
        }
        if let Some(label) = y.iter().find(|l| **l != LABEL_DOWN && **l != LABEL_UP) {
            return Err(SignalError::InvalidInput(format!("unexpected label {}", label)));
        }

        let n_features = x[0].len();
        if n_features == 0 {
            return Err(SignalError::InvalidInput(
                "feature rows are empty".to_string(),
            ));
        }
        if let Some(bad) = x.iter().find(|r| r.len() != n_features) {
            return Err(SignalError::FeatureMismatch {
                expected: n_features,
                got: bad.len(),
            });
        }

        let n = x.len();
        let k = params
            .max_features
            .unwrap_or_else(|| default_max_features(n_features))
            .clamp(1, n_features);

        let tree_params = DecisionTreeClassifierParameters::default()
            .with_max_depth(params.max_depth)
            .with_min_samples_split(params.min_samples_split);

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut trees = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let mut features = rand::seq::index::sample(&mut rng, n_features, k).into_vec();
            features.sort_unstable();

            let labels: Vec<u32> = sample.iter().map(|&i| y[i]).collect();
            let first = labels[0];
            if labels.iter().all(|l| *l == first) {
                trees.push(ForestTree::Constant(first));
                continue;
            }

            let matrix = column_subset(sample.iter().map(|&i| &x[i]), &features);
            let tree = Tree::fit(&matrix, &labels, tree_params.clone()).map_err(model_err)?;
            trees.push(ForestTree::Split { features, tree });
        }

        Ok(Self {
            params: params.clone(),
            n_features,
            trees,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Vote shares for every row
    pub fn predict_proba(&self, rows: &[Vec<f64>]) -> Result<Vec<ClassProbabilities>> {
        if let Some(bad) = rows.iter().find(|r| r.len() != self.n_features) {
            return Err(SignalError::FeatureMismatch {
                expected: self.n_features,
                got: bad.len(),
            });
        }
        if rows.is_empty() || self.trees.is_empty() {
            return Ok(Vec::new());
        }

        let mut up_votes = vec![0usize; rows.len()];
        for tree in &self.trees {
            match tree {
                ForestTree::Constant(label) => {
                    if *label == LABEL_UP {
                        up_votes.iter_mut().for_each(|v| *v += 1);
                    }
                }
                ForestTree::Split { features, tree } => {
                    let matrix = column_subset(rows.iter(), features);
                    let predicted = tree.predict(&matrix).map_err(model_err)?;
                    for (votes, label) in up_votes.iter_mut().zip(predicted) {
                        if label == LABEL_UP {
                            *votes += 1;
                        }
                    }
                }
            }
        }

        let n_trees = self.trees.len() as f64;
        Ok(up_votes
            .into_iter()
            .map(|votes| {
                let up = votes as f64 / n_trees;
                ClassProbabilities { down: 1.0 - up, up }
            })
            .collect())
    }

    /// Probabilities for a single row
    pub fn predict_proba_row(&self, row: &[f64]) -> Result<ClassProbabilities> {
        self.predict_proba(&[row.to_vec()])?
            .into_iter()
            .next()
            .ok_or_else(|| SignalError::Model("forest has no trees".to_string()))
    }

    /// Most likely class per row; ties resolve to DOWN
    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<u32>> {
        Ok(self
            .predict_proba(rows)?
            .into_iter()
            .map(|p| if p.up > p.down { LABEL_UP } else { LABEL_DOWN })
            .collect())
    }
}
