//! Per-asset model registry.
//!
//! Model and scaler live in one [`LoadedModel`] so they can only ever be
//! replaced together. The server holds the registry behind an `RwLock` and
//! swaps the whole map on reload.

use crate::model::{load_pair, ModelArtifact, StandardScaler};
use chrono::{DateTime, Utc};
use market_data::Asset;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct LoadedModel {
    pub artifact: ModelArtifact,
    pub scaler: StandardScaler,
    pub loaded_at: DateTime<Utc>,
}

/// Listing entry for `GET /models`
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub asset: Asset,
    pub trained_at: DateTime<Utc>,
    pub horizon_days: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub test_accuracy: Option<f64>,
    pub n_trees: usize,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadFailure {
    pub asset: Asset,
    pub reason: String,
}

/// Outcome of scanning the models directory
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub loaded: Vec<Asset>,
    pub missing: Vec<Asset>,
    pub failed: Vec<LoadFailure>,
}

#[derive(Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<Asset, Arc<LoadedModel>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every supported asset's pair from `dir`
    pub fn load_all(dir: &Path) -> (Self, LoadReport) {
        let mut registry = Self::new();
        let mut report = LoadReport::default();

        for asset in Asset::all() {
            match load_pair(dir, &asset) {
                Ok(Some((artifact, scaler))) => {
                    registry.insert(asset, artifact, scaler);
                    report.loaded.push(asset);
                }
                Ok(None) => {
                    warn!("Model or scaler not found for {} in {}", asset, dir.display());
                    report.missing.push(asset);
                }
                Err(e) => {
                    error!("Failed to load model for {}: {}", asset, e);
                    report.failed.push(LoadFailure {
                        asset,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Loaded models for assets: {:?}",
            report.loaded.iter().map(Asset::name).collect::<Vec<_>>()
        );
        (registry, report)
    }

    pub fn insert(&mut self, asset: Asset, artifact: ModelArtifact, scaler: StandardScaler) {
        self.models.insert(
            asset,
            Arc::new(LoadedModel {
                artifact,
                scaler,
                loaded_at: Utc::now(),
            }),
        );
    }

    pub fn get(&self, asset: &Asset) -> Option<Arc<LoadedModel>> {
        self.models.get(asset).cloned()
    }

    /// Loaded assets in catalog order
    pub fn loaded_assets(&self) -> Vec<Asset> {
        Asset::all()
            .into_iter()
            .filter(|a| self.models.contains_key(a))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn summaries(&self) -> Vec<ModelSummary> {
        self.loaded_assets()
            .into_iter()
            .filter_map(|asset| {
                let m = self.models.get(&asset)?;
                Some(ModelSummary {
                    asset,
                    trained_at: m.artifact.trained_at,
                    horizon_days: m.artifact.horizon_days,
                    train_rows: m.artifact.train_rows,
                    test_rows: m.artifact.test_rows,
                    test_accuracy: m.artifact.test_accuracy,
                    n_trees: m.artifact.forest.n_trees(),
                    loaded_at: m.loaded_at,
                })
            })
            .collect()
    }
}
