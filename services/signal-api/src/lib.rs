pub mod config;
pub mod error;
pub mod handlers;
pub mod health;
pub mod model;
pub mod observability;
pub mod pipeline;
pub mod prediction;
pub mod registry;
pub mod training;

use std::sync::Arc;
use axum::{
    routing::{get, post},
    Router,
};
use market_data::HistoricalDataSource;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Settings;
pub use error::{Result, SignalError};
pub use observability::MetricsCollector;
pub use registry::ModelRegistry;

/// Application state shared across handlers
pub struct AppState {
    pub settings: Settings,
    /// Swapped wholesale on reload; handlers clone the inner `Arc`
    registry: RwLock<Arc<ModelRegistry>>,
    pub source: Arc<dyn HistoricalDataSource>,
    pub metrics: MetricsCollector,
}

impl AppState {
    pub fn new(
        settings: Settings,
        registry: ModelRegistry,
        source: Arc<dyn HistoricalDataSource>,
    ) -> Self {
        Self {
            settings,
            registry: RwLock::new(Arc::new(registry)),
            source,
            metrics: MetricsCollector::new(),
        }
    }

    /// Current registry snapshot
    pub async fn registry(&self) -> Arc<ModelRegistry> {
        self.registry.read().await.clone()
    }

    pub async fn replace_registry(&self, registry: ModelRegistry) {
        *self.registry.write().await = Arc::new(registry);
    }
}

/// Build the API router
pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/healthz", get(health::healthz))
        .route("/health/detail", get(health::health_detail))
        .route("/predict", post(handlers::predict::predict))
        .route("/models", get(handlers::models::list_models))
        .route("/models/reload", post(handlers::models::reload_models))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
