//! Health check endpoints for load balancers and monitoring

use axum::{extract::State, http::StatusCode, Json};
use market_data::{supported_asset_names, Asset, SourceHealth};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

/// Liveness - fast, no external dependencies
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// GET /health - service status and which assets can be predicted
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let registry = state.registry().await;
    Json(HealthResponse {
        status: "ok",
        supported_assets: supported_asset_names(),
        loaded_models: registry.loaded_assets(),
    })
}

/// GET /health/detail - registry, data source and metrics
/// Use for debugging and monitoring dashboards
pub async fn health_detail(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DetailedHealthResponse>, (StatusCode, Json<DetailedHealthResponse>)> {
    let registry = state.registry().await;
    let source = state.source.health().await;

    let mut checks = vec![];
    let mut all_ok = true;

    let models_status = if registry.is_empty() {
        all_ok = false;
        "empty".to_string()
    } else {
        format!("{} loaded", registry.len())
    };
    checks.push(HealthCheck {
        name: "models".to_string(),
        status: models_status,
    });

    if !source.is_healthy {
        all_ok = false;
    }
    checks.push(HealthCheck {
        name: "data_source".to_string(),
        status: if source.is_healthy { "ok" } else { "error" }.to_string(),
    });

    let metrics = state.metrics.snapshot().await;

    let response = DetailedHealthResponse {
        status: if all_ok { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks,
        data_source: source,
        metrics: HealthMetrics {
            uptime_secs: metrics.uptime_secs,
            counters: metrics.counters,
            gauges: metrics.gauges,
            histogram_means: metrics.histogram_means,
        },
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub supported_assets: Vec<&'static str>,
    pub loaded_models: Vec<Asset>,
}

#[derive(Serialize)]
pub struct DetailedHealthResponse {
    pub status: String,
    pub version: String,
    pub checks: Vec<HealthCheck>,
    pub data_source: SourceHealth,
    pub metrics: HealthMetrics,
}

#[derive(Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: String,
}

#[derive(Serialize)]
pub struct HealthMetrics {
    pub uptime_secs: u64,
    pub counters: std::collections::HashMap<String, u64>,
    pub gauges: std::collections::HashMap<String, f64>,
    pub histogram_means: std::collections::HashMap<String, f64>,
}
