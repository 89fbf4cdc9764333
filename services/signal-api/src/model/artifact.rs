//! On-disk model + scaler pairs.
//!
//! Each asset owns two files in the models directory:
//! `{ASSET}_model.bin` (bincode [`ModelArtifact`]) and
//! `{ASSET}_scaler.json` ([`StandardScaler`]). The model file embeds the
//! scaler it was trained with; the JSON file must match it exactly, so a
//! model and a scaler from different training runs never load together.

use super::forest::DirectionForest;
use super::scaler::StandardScaler;
use crate::error::{Result, SignalError};
use crate::pipeline::feature_names;
use chrono::{DateTime, Utc};
use market_data::Asset;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Trained classifier plus the metadata needed to serve it
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub asset: String,
    pub feature_names: Vec<String>,
    pub horizon_days: usize,
    pub trained_at: DateTime<Utc>,
    pub train_rows: usize,
    pub test_rows: usize,
    pub test_accuracy: Option<f64>,
    pub forest: DirectionForest,
    /// Scaler fitted in the same run as `forest`
    pub scaler: StandardScaler,
}

pub fn model_path(dir: &Path, asset: &Asset) -> PathBuf {
    dir.join(format!("{}_model.bin", asset.name()))
}

pub fn scaler_path(dir: &Path, asset: &Asset) -> PathBuf {
    dir.join(format!("{}_scaler.json", asset.name()))
}

/// Reject pairs that would silently mis-score: wrong asset, stale feature
/// layout, a scaler of a different width, or a scaler from another run
pub fn check_consistency(asset: &Asset, artifact: &ModelArtifact, scaler: &StandardScaler) -> Result<()> {
    if artifact.asset != asset.name() {
        return Err(SignalError::Artifact(format!(
            "model file for {} holds a model for {}",
            asset, artifact.asset
        )));
    }
    if artifact.feature_names != feature_names() {
        return Err(SignalError::Artifact(format!(
            "{} model was trained on features {:?}",
            asset, artifact.feature_names
        )));
    }
    let expected = artifact.feature_names.len();
    if scaler.n_features() != expected || artifact.forest.n_features() != expected {
        return Err(SignalError::FeatureMismatch {
            expected,
            got: if scaler.n_features() != expected {
                scaler.n_features()
            } else {
                artifact.forest.n_features()
            },
        });
    }
    if artifact.scaler != *scaler {
        return Err(SignalError::Artifact(format!(
            "{} scaler file does not belong to the model trained at {}",
            asset, artifact.trained_at
        )));
    }
    if scaler.scale.len() != scaler.mean.len() {
        return Err(SignalError::Artifact(format!(
            "{} scaler has {} means but {} scales",
            asset,
            scaler.mean.len(),
            scaler.scale.len()
        )));
    }
    Ok(())
}

/// Write through a temp file so readers never see a half-written file
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Persist a model/scaler pair, creating the directory if needed
pub fn save_pair(
    dir: &Path,
    asset: &Asset,
    artifact: &ModelArtifact,
    scaler: &StandardScaler,
) -> Result<(PathBuf, PathBuf)> {
    check_consistency(asset, artifact, scaler)?;
    fs::create_dir_all(dir)?;

    let model_file = model_path(dir, asset);
    let scaler_file = scaler_path(dir, asset);

    let model_bytes =
        bincode::serialize(artifact).map_err(|e| SignalError::Artifact(e.to_string()))?;
    let scaler_json =
        serde_json::to_vec_pretty(scaler).map_err(|e| SignalError::Artifact(e.to_string()))?;

    write_atomic(&model_file, &model_bytes)?;
    write_atomic(&scaler_file, &scaler_json)?;

    debug!("Wrote {} and {}", model_file.display(), scaler_file.display());
    Ok((model_file, scaler_file))
}

/// Load an asset's pair. `Ok(None)` when either file is missing.
pub fn load_pair(dir: &Path, asset: &Asset) -> Result<Option<(ModelArtifact, StandardScaler)>> {
    let model_file = model_path(dir, asset);
    let scaler_file = scaler_path(dir, asset);

    if !(model_file.exists() && scaler_file.exists()) {
        return Ok(None);
    }

    let artifact: ModelArtifact = bincode::deserialize(&fs::read(&model_file)?)
        .map_err(|e| SignalError::Artifact(format!("{}: {}", model_file.display(), e)))?;
    let scaler: StandardScaler = serde_json::from_slice(&fs::read(&scaler_file)?)
        .map_err(|e| SignalError::Artifact(format!("{}: {}", scaler_file.display(), e)))?;

    check_consistency(asset, &artifact, &scaler)?;
    Ok(Some((artifact, scaler)))
}
