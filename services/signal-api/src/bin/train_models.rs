/// Offline trainer: fetches history, fits a scaler + forest per asset and
/// writes `{ASSET}_model.bin` / `{ASSET}_scaler.json` to the models directory.
///
/// Usage:
///   cargo run --bin train-models -- --asset EURUSD --asset BTCUSD --period 5y
use anyhow::bail;
use clap::Parser;
use market_data::{supported_asset_names, Asset, YahooFinanceClient};
use signal_api::{training::train_all, Settings};
use std::path::PathBuf;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "train-models")]
#[command(about = "Train per-asset direction classifiers")]
struct Args {
    /// Asset to train (repeatable); defaults to every supported asset
    #[arg(long = "asset")]
    assets: Vec<String>,

    /// Output directory; overrides `models_dir` from settings
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// History period to download, e.g. 2y, 5y, max
    #[arg(long)]
    period: Option<String>,

    /// Number of trees in each forest
    #[arg(long)]
    n_estimators: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let args = Args::parse();
    let mut settings = Settings::load()?;

    if let Some(dir) = args.models_dir {
        settings.models_dir = dir;
    }
    if let Some(period) = args.period {
        settings.training.period = period;
    }
    if let Some(n) = args.n_estimators {
        settings.training.n_estimators = n;
    }
    settings.validate()?;

    let assets = if args.assets.is_empty() {
        Asset::all()
    } else {
        let mut assets = Vec::with_capacity(args.assets.len());
        for name in &args.assets {
            match Asset::parse(name) {
                Some(asset) => assets.push(asset),
                None => bail!(
                    "Unsupported asset: {} (supported: {})",
                    name.to_uppercase(),
                    supported_asset_names().join(", ")
                ),
            }
        }
        assets
    };

    let mut client = YahooFinanceClient::with_base_url(&settings.market_data.base_url);
    if !settings.market_data.auto_adjust {
        client = client.without_adjustment();
    }

    info!(
        "Training {} assets on {} of history into {}",
        assets.len(),
        settings.training.period,
        settings.models_dir.display()
    );

    let summary = train_all(&assets, &client, &settings.training, &settings.models_dir).await;

    for outcome in &summary.trained {
        info!(
            "{}: {} train / {} test rows, accuracy {}",
            outcome.asset,
            outcome.train_rows,
            outcome.test_rows,
            outcome
                .test_accuracy
                .map(|a| format!("{:.3}", a))
                .unwrap_or_else(|| "n/a".to_string())
        );
    }

    if summary.trained.is_empty() {
        bail!("no models were trained");
    }
    Ok(())
}
