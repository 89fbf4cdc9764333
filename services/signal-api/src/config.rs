//! Service configuration
//!
//! Layered: built-in defaults, then an optional `signal.toml` in the working
//! directory, then `SIGNAL__*` environment variables
//! (e.g. `SIGNAL__SERVER__PORT=9000`, `SIGNAL__PREDICTION__THRESHOLD=0.6`).

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerSettings,
    /// Directory holding `{ASSET}_model.bin` / `{ASSET}_scaler.json` pairs
    pub models_dir: PathBuf,
    pub market_data: MarketDataSettings,
    pub prediction: PredictionSettings,
    pub training: TrainingSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarketDataSettings {
    pub base_url: String,
    /// Rescale OHLC by adjusted close
    pub auto_adjust: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PredictionSettings {
    /// Trading days the latest feature vector must cover
    pub lookback_days: i64,
    /// Probability a side must exceed to emit UP or DOWN
    pub threshold: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrainingSettings {
    /// History period requested for training, e.g. "5y"
    pub period: String,
    pub horizon_days: usize,
    pub test_fraction: f64,
    pub n_estimators: usize,
    pub max_depth: u16,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            models_dir: PathBuf::from("models/saved"),
            market_data: MarketDataSettings {
                base_url: "https://query1.finance.yahoo.com".to_string(),
                auto_adjust: true,
            },
            prediction: PredictionSettings {
                lookback_days: 30,
                threshold: 0.55,
            },
            training: TrainingSettings::default(),
        }
    }
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            period: "5y".to_string(),
            horizon_days: 1,
            test_fraction: 0.2,
            n_estimators: 200,
            max_depth: 6,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

impl Settings {
    /// Load settings from defaults, `signal.toml` and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::with_name("signal").required(false))
            .add_source(
                Environment::with_prefix("SIGNAL")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Re-run after any programmatic override of loaded settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.5..1.0).contains(&self.prediction.threshold) {
            return Err(ConfigError::Message(format!(
                "prediction.threshold must be in [0.5, 1.0), got {}",
                self.prediction.threshold
            )));
        }
        if self.prediction.lookback_days < 1 {
            return Err(ConfigError::Message(
                "prediction.lookback_days must be positive".to_string(),
            ));
        }
        if self.training.horizon_days < 1 {
            return Err(ConfigError::Message(
                "training.horizon_days must be at least 1".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.training.test_fraction) {
            return Err(ConfigError::Message(format!(
                "training.test_fraction must be in [0, 1), got {}",
                self.training.test_fraction
            )));
        }
        if self.training.period.trim().is_empty() {
            return Err(ConfigError::Message(
                "training.period must not be empty".to_string(),
            ));
        }
        if self.training.n_estimators == 0 {
            return Err(ConfigError::Message(
                "training.n_estimators must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
