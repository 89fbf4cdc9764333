//! Model listing and hot reload

use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::info;

use super::ApiError;
use crate::{
    observability::metrics,
    registry::{LoadReport, ModelRegistry, ModelSummary},
    AppState,
};

/// GET /models - metadata of every loaded model
pub async fn list_models(State(state): State<Arc<AppState>>) -> Json<Vec<ModelSummary>> {
    Json(state.registry().await.summaries())
}

/// POST /models/reload - rescan the models directory and swap the registry
pub async fn reload_models(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LoadReport>, ApiError> {
    let dir = state.settings.models_dir.clone();
    let (registry, report) = tokio::task::spawn_blocking(move || ModelRegistry::load_all(&dir))
        .await
        .map_err(|e| ApiError::internal(format!("reload task failed: {}", e)))?;

    let loaded = registry.len();
    state.replace_registry(registry).await;
    state.metrics.increment(metrics::MODEL_RELOADS, 1).await;
    state.metrics.gauge(metrics::LOADED_MODELS, loaded as f64).await;
    info!("Reloaded model registry: {} models", loaded);

    Ok(Json(report))
}
