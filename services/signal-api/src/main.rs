use std::sync::Arc;
use market_data::YahooFinanceClient;
use signal_api::{AppState, ModelRegistry, Settings};
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("Starting SignalGPT signal API...");

    let settings = Settings::load()?;

    let mut client = YahooFinanceClient::with_base_url(&settings.market_data.base_url);
    if !settings.market_data.auto_adjust {
        client = client.without_adjustment();
    }

    info!("Loading models from {}", settings.models_dir.display());
    let (registry, report) = ModelRegistry::load_all(&settings.models_dir);
    if registry.is_empty() {
        warn!("No models loaded; run train-models first. /predict will fail until then");
    }
    info!(
        "✓ {} models loaded, {} missing, {} failed",
        report.loaded.len(),
        report.missing.len(),
        report.failed.len()
    );

    let addr = settings.bind_addr();
    let state = Arc::new(AppState::new(settings, registry, Arc::new(client)));
    state
        .metrics
        .gauge(signal_api::observability::metrics::LOADED_MODELS, report.loaded.len() as f64)
        .await;

    let app = signal_api::app(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Signal API listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
